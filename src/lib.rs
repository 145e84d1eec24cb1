pub mod geofence;
pub mod progress;
pub mod route;
pub mod shared;
pub mod trip;

pub mod prelude {
    pub use crate::geofence::{GeofenceConfig, GeofenceEngine, GeofenceState, Transition};
    pub use crate::progress::{
        HitMode, LocationProvider, Notification, NotificationSink, SampleInbox,
        TripProgressController, TripStore,
    };
    pub use crate::route::RouteOptimizer;
    pub use crate::shared::{Coordinate, Distance, LocationSample, Timestamp};
    pub use crate::trip::{Stop, StopStatus};
}
