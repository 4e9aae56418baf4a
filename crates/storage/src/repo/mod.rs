mod comments;
pub(crate) mod filter;
mod subscriptions;
mod users;
mod votes;
