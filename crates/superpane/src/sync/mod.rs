pub mod live;

pub use live::LiveRefresh;
