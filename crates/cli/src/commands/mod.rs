mod normalize;
mod parse;
mod resolve;
mod version;

pub(crate) use normalize::cmd_normalize;
pub(crate) use parse::cmd_parse;
pub(crate) use resolve::cmd_resolve;
pub(crate) use version::cmd_version;
