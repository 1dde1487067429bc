mod common;

use common::{CountingDriver, REV, board, registry};
use soc::{Soc, SocError, ahb::MemoryAhb};

#[test]
fn init_runs_once_and_caches_state() {
    let leaf = CountingDriver::leak("leaf", &["test,leaf"]);
    let mut ahb = MemoryAhb::new();
    let mut soc = Soc::from_blob(&mut ahb, REV, &board()).unwrap();
    soc.bind_drivers(&registry(&[leaf])).unwrap();
    let dev = soc.device_handles().next().unwrap();

    assert!(!soc.device(dev).unwrap().is_initialised());
    let first = *soc.device_init_driver(dev).unwrap().downcast_ref::<usize>().unwrap();
    let second = *soc.device_init_driver(dev).unwrap().downcast_ref::<usize>().unwrap();
    assert_eq!(first, second);
    assert_eq!(leaf.inits(), 1);
    assert!(soc.device(dev).unwrap().is_initialised());
}

#[test]
fn failed_init_is_retried_on_next_request() {
    let leaf = CountingDriver::leak("leaf", &["test,leaf"]);
    leaf.fail_next(1);
    let mut ahb = MemoryAhb::new();
    let mut soc = Soc::from_blob(&mut ahb, REV, &board()).unwrap();
    soc.bind_drivers(&registry(&[leaf])).unwrap();
    let dev = soc.device_handles().next().unwrap();

    assert!(matches!(soc.device_init_driver(dev), Err(SocError::DriverInit(_))));
    assert!(!soc.device(dev).unwrap().is_initialised());
    let state = *soc.device_init_driver(dev).unwrap().downcast_ref::<usize>().unwrap();
    assert_eq!(state, 2);
    assert_eq!(leaf.inits(), 2);
}

#[test]
fn driver_data_finds_the_bound_device() {
    let leaf = CountingDriver::leak("leaf", &["test,leaf"]);
    let deep = CountingDriver::leak("deep", &["test,deep"]);
    let idle = CountingDriver::leak("idle", &["test,nothing"]);
    let mut ahb = MemoryAhb::new();
    let mut soc = Soc::from_blob(&mut ahb, REV, &board()).unwrap();
    soc.bind_drivers(&registry(&[leaf, deep, idle])).unwrap();

    assert_eq!(*soc.driver_data::<usize>(deep).unwrap(), 1);
    assert_eq!(deep.inits(), 1);
    assert_eq!(leaf.inits(), 0);
    assert!(matches!(soc.driver_data::<usize>(idle), Err(SocError::NotFound)));
    assert!(matches!(soc.driver_data::<String>(deep), Err(SocError::InvalidArgument)));

    assert_eq!(*soc.driver_data_by_name::<usize>(leaf, "lpc").unwrap(), 1);
    assert!(matches!(
        soc.driver_data_by_name::<usize>(deep, "lpc"),
        Err(SocError::InvalidArgument)
    ));
    assert!(matches!(
        soc.driver_data_by_name::<usize>(leaf, "/bus/orphan"),
        Err(SocError::NotFound)
    ));
    assert_eq!(leaf.inits(), 1);
}

#[test]
fn unbind_destroys_each_initialised_device_once() {
    let leaf = CountingDriver::leak("leaf", &["test,leaf"]);
    let deep = CountingDriver::leak("deep", &["test,deep"]);
    let child = CountingDriver::leak("child", &["test,child"]);
    let mut ahb = MemoryAhb::new();
    let mut soc = Soc::from_blob(&mut ahb, REV, &board()).unwrap();
    soc.bind_drivers(&registry(&[leaf, deep, child])).unwrap();
    assert_eq!(soc.devices().len(), 3);

    soc.driver_data::<usize>(leaf).unwrap();
    soc.driver_data::<usize>(child).unwrap();
    soc.unbind_all();
    assert!(soc.devices().is_empty());
    assert_eq!((leaf.destroys(), deep.destroys(), child.destroys()), (1, 0, 1));

    soc.unbind_all();
    assert_eq!((leaf.destroys(), deep.destroys(), child.destroys()), (1, 0, 1));
}

#[test]
fn dropping_the_context_unbinds() {
    let leaf = CountingDriver::leak("leaf", &["test,leaf"]);
    let mut ahb = MemoryAhb::new();
    {
        let mut soc = Soc::from_blob(&mut ahb, REV, &board()).unwrap();
        soc.bind_drivers(&registry(&[leaf])).unwrap();
        soc.driver_data::<usize>(leaf).unwrap();
    }
    assert_eq!(leaf.destroys(), 1);
    assert!(ahb.writes().is_empty());
}

#[test]
fn rebinding_releases_previous_state() {
    let leaf = CountingDriver::leak("leaf", &["test,leaf"]);
    let mut ahb = MemoryAhb::new();
    let mut soc = Soc::from_blob(&mut ahb, REV, &board()).unwrap();
    let registry = registry(&[leaf]);
    soc.bind_drivers(&registry).unwrap();
    soc.driver_data::<usize>(leaf).unwrap();
    soc.bind_drivers(&registry).unwrap();
    assert_eq!(leaf.destroys(), 1);
    assert!(!soc.devices()[0].is_initialised());
}
