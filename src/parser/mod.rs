//! Line grammar (C1): turn a raw log line into a [`LogLine`], and a
//! `LogLine`'s payload into a tagged [`trace::TraceEvent`] or
//! [`printk::PrintkEvent`].

pub mod line;
pub mod printk;
pub mod trace;

pub use line::{cmp_order, parse_logline, LogLine};
pub use printk::PrintkEvent;
pub use trace::TraceEvent;
