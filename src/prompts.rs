//! Prompt text and the prompt composer.
//!
//! Every fixed fragment the completion model sees lives here, so changing the
//! wording means editing exactly one place and the unit tests below can check
//! the composed prompt without a network call.
//!
//! The composer is a pure function: an ordered table of task fragments is
//! filtered by the active [`TransformOptions`] and concatenated around the
//! caller's code.

use crate::config::{DetailLevel, TransformOptions};

/// System message sent with every completion request.
pub const SYSTEM_PROMPT: &str = "You only generate raw code output.";

/// Last line of every composed prompt.
pub const CLOSING_DIRECTIVE: &str = "Only generate the code output with no conversation.";

/// Heading placed above the numbered task list.
pub const TASKS_HEADING: &str = "Generate the corrected code by completing the following tasks:";

/// Heading placed directly above the caller's code.
pub const CODE_HEADING: &str = "Here is the code to fix:";

/// Rename task.
pub const RENAME_TASK: &str = "Rename variables, functions, and other identifiers to clear, \
descriptive names that follow the naming conventions of the language, keeping behaviour unchanged.";

/// Comment task per detail level.
const COMMENT_TASKS: [(DetailLevel, &str); 3] = [
    (
        DetailLevel::Basic,
        "Add comments to the code with very brief documentation with short inline comments together in the code.",
    ),
    (
        DetailLevel::Intermediate,
        "Add comments to the code with detailed documentation with function explanations, parameters, and return values as comments.",
    ),
    (
        DetailLevel::Advanced,
        "Add comments to the code with a full, structured documentation including inline comments, function descriptions, examples, and possible optimizations as comments.",
    ),
];

/// The comment-task fragment for `level`.
pub fn comment_task(level: DetailLevel) -> &'static str {
    COMMENT_TASKS
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, text)| *text)
        .unwrap_or(COMMENT_TASKS[0].1)
}

/// The section that embeds an uploaded coding standard.
pub fn standard_section(standard: &str) -> String {
    format!("Here is the coding standard:\n{standard}\nwhich should be followed strictly.\n\n")
}

/// Active task fragments, in the order they are numbered.
pub fn active_tasks(options: TransformOptions) -> Vec<&'static str> {
    let table: [Option<&'static str>; 2] = [
        options.rename_identifiers.then_some(RENAME_TASK),
        options.comments.map(comment_task),
    ];
    table.into_iter().flatten().collect()
}

/// Build the prompt sent to the completion service.
///
/// Layout:
/// 1. coding-standard section (only when `standard` is non-empty)
/// 2. numbered task list (omitted when no task is active)
/// 3. the caller's `code`, verbatim
/// 4. [`CLOSING_DIRECTIVE`]
///
/// With no active task the prompt is still well-formed; the model is simply
/// asked to return the code.
pub fn compose_prompt(standard: &str, code: &str, options: TransformOptions) -> String {
    let mut prompt = String::with_capacity(standard.len() + code.len() + 512);

    if !standard.is_empty() {
        prompt.push_str(&standard_section(standard));
    }

    let tasks = active_tasks(options);
    if !tasks.is_empty() {
        prompt.push_str(TASKS_HEADING);
        prompt.push('\n');
        for (i, task) in tasks.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, task));
        }
        prompt.push('\n');
    }

    prompt.push_str(CODE_HEADING);
    prompt.push('\n');
    prompt.push_str(code);
    prompt.push('\n');
    prompt.push_str(CLOSING_DIRECTIVE);
    prompt.push('\n');
    prompt
}
