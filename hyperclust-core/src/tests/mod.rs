mod test_end_to_end;
mod test_spectral;
