mod fixtures;
mod test_config;
mod test_records;
mod test_sweep;
