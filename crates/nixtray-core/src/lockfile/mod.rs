mod change;
mod differ;
mod document;

pub use {
    change::{ChangeEntry, ChangeSet},
    differ::{REV_DISPLAY_LEN, describe, diff, diff_documents},
    document::{LockDocument, LockNode, LockedAttrs},
};
