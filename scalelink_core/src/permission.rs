//! Access-rights gate in front of `open`.

use scalelink_traits::{DeviceInfo, PermissionBroker};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// A grant request is in flight; poll again later.
    Deferred,
}

/// Check rights for `device`, firing a grant request when they are missing.
///
/// Never waits for the grant. A denial looks the same as an undecided request.
pub fn check<P: PermissionBroker + ?Sized>(broker: &P, device: &DeviceInfo) -> Access {
    if broker.has_permission(device) {
        return Access::Granted;
    }
    debug!(device = %device, "requesting access rights");
    broker.request_permission(device);
    Access::Deferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FakeBus;

    #[test]
    fn granted_does_not_request() {
        let bus = FakeBus::new();
        let dev = FakeBus::ch340(1);
        assert_eq!(check(&bus, &dev), Access::Granted);
        assert_eq!(bus.permission_requests(), 0);
    }

    #[test]
    fn missing_rights_fire_a_request_each_poll() {
        let bus = FakeBus::new();
        bus.grant_after_requests(5);
        let dev = FakeBus::ch340(1);
        assert_eq!(check(&bus, &dev), Access::Deferred);
        assert_eq!(check(&bus, &dev), Access::Deferred);
        assert_eq!(bus.permission_requests(), 2);
    }
}
