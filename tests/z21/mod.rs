#[cfg(feature = "cli")]
mod test_cli;
mod test_container;
mod test_export;
mod test_load_sqlite;
mod test_load_xml;
mod test_real_files;
