//! Deferred batched file operations.
//!
//! While a transaction is active on a file-system context, `remove_file`
//! calls queue into it instead of executing immediately. Committing
//! replays the queue step by step, checking the cancellation flag before
//! every step; canceling drops the queue untouched.

use crate::url::Url;

/// How to finish a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitMode {
    /// Execute the queued operations permanently.
    Commit,
    /// Execute with user-undo support where the platform has it
    /// (e.g. move deletions to the trash instead of unlinking).
    CommitWithUndo,
    /// Drop the queue without executing anything.
    Cancel,
}

/// One queued deferred operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingOp {
    RemoveFile(Url),
}

/// A batch of deferred operations, owned by one file-system context.
/// Only one may be active per context at a time.
#[derive(Debug, Default)]
pub struct Transaction {
    pending: Vec<PendingOp>,
}

impl Transaction {
    pub fn new() -> Transaction {
        Transaction::default()
    }

    pub fn queue_remove_file(&mut self, url: &Url) {
        self.pending.push(PendingOp::RemoveFile(url.clone()));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hand out the queued operations for execution.
    pub fn take_pending(&mut self) -> Vec<PendingOp> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::{KindHint, Url};

    #[test]
    fn queue_accumulates_in_order() {
        let mut tx = Transaction::new();
        let a = Url::from_parts("file", "", "tmp/a", KindHint::File);
        let b = Url::from_parts("file", "", "tmp/b", KindHint::File);
        tx.queue_remove_file(&a);
        tx.queue_remove_file(&b);
        assert_eq!(tx.len(), 2);

        let ops = tx.take_pending();
        assert_eq!(ops[0], PendingOp::RemoveFile(a));
        assert_eq!(ops[1], PendingOp::RemoveFile(b));
        assert!(tx.is_empty());
    }
}
