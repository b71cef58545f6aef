/// `<pkg version>+git.<commit count>.<short sha>[.dirty]`; `nogit` outside a checkout.
pub const FULL: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+git.",
    env!("TASKLY_GIT_COUNT"),
    ".",
    env!("TASKLY_GIT_SHA"),
    env!("TASKLY_GIT_DIRTY")
);
