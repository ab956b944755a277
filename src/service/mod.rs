pub mod report;
pub mod review;

pub use report::{DashboardMetrics, DayCount, Heatmap, Reporter};
pub use review::{DueGroups, ReviewService};

use crate::database::Store;

impl<S: Store> ReviewService<S> {
    pub fn reporter(&self) -> Reporter<'_, S> {
        Reporter::new(self.store())
    }
}
