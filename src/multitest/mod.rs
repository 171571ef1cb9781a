mod distribution;
mod gauge;
mod lockup;
mod suite;
