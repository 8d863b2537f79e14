/// How a handler left its work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The cluster job finished and the item was deleted.
    Completed,
    /// The wait was cancelled out-of-band and the item was deleted.
    Abandoned,
    /// A redelivery of work that was already reconciled; the item was deleted.
    AlreadyFinished,
    /// The item can never succeed and was buried.
    Buried(&'static str),
}
