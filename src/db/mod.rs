pub mod ncdac;
pub mod prod_db;
