//! CLI command handlers, one file per command.

mod classify;
mod completions;
mod login;
mod output_dir;
mod render;
mod run;
mod template;

pub use classify::run_classify;
pub use completions::{run_completions, run_man};
pub use login::run_login;
pub use output_dir::run_output_dir;
pub use render::run_render;
pub use run::run_queue;
pub use template::run_template;
