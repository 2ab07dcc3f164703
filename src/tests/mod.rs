mod binary;
mod mutate;
mod parse_bad;
mod variant;
