//! End-to-end engine tests over the in-memory store, a temporary blob
//! directory, and a live notification hub. `postgres_test` repeats the
//! core scenarios against a real database when `VAULT_TEST_DATABASE_URL`
//! is set.

mod helpers;

mod archive_test;
mod favorite_test;
mod notification_test;
mod session_test;
mod trash_test;
mod tree_test;
mod upload_test;
mod ws_test;
