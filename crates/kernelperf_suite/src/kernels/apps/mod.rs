mod halo_exchange;

pub use halo_exchange::HaloExchange;
