pub mod alerts;
pub mod api;
pub mod display;
pub mod fsm;
pub mod notify;
pub mod persistence;
pub mod poller;
pub mod pricelog;
pub mod pricetable;
pub mod session;
pub mod watchlist;
