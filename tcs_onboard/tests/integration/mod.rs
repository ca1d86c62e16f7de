mod arbiter;
mod breaker_sequence;
mod hsl_handover;
mod kvb_approach;
mod properties;
mod replay;
mod vacma_timing;
