/// Balance primitives: cents conversion, credit/debit, compare-and-save
pub mod balance;

/// Bank accounts owned by users
pub mod bank_account;

/// Ordered cleanup steps run before a user or bank account is deleted
pub mod cascade;

/// Symmetric connections between users
pub mod connection;

/// Pagination over slices and queries
pub mod page;

/// Transactions, bank transfers and their history
pub mod transfer;

/// User registration, profile updates and deletion
pub mod user;
