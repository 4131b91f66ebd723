pub mod lib_sqlite;
