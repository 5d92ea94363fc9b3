mod masked_output;
mod zeroize_on_drop;
