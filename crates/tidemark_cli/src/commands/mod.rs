pub(crate) mod assign;
pub(crate) mod filter;
pub(crate) mod fold;
pub(crate) mod meta;
pub(crate) mod next;
pub(crate) mod shared;
pub(crate) mod show;
