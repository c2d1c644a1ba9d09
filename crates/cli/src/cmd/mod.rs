mod eval;
mod list;
mod show;

pub use eval::{EvalOptions, cmd_eval};
pub use list::cmd_list;
pub use show::cmd_show;
