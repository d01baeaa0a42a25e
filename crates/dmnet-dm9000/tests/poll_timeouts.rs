//! Every hardware wait has a poll budget; a wedged chip must surface as a timeout error.

use dmnet_dm9000::sim::{Failure, SimBus};
use dmnet_dm9000::{Dm9000, Dm9000Error};

const MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

fn assert_timeout(result: Result<(), Dm9000Error>, op: &str) {
    match result {
        Err(Dm9000Error::Timeout { op: got }) => assert_eq!(got, op),
        other => panic!("expected timeout on {op}, got {other:?}"),
    }
}

#[test]
fn stuck_mac_reset_times_out() {
    let mut dev = Dm9000::new(SimBus::with_failure(Failure::StuckReset), MAC);
    assert_timeout(dev.reset(), "NCR reset");
    assert_timeout(dev.init(), "NCR reset");
}

#[test]
fn stuck_phy_busy_times_out() {
    let mut dev = Dm9000::new(SimBus::with_failure(Failure::StuckPhyBusy), MAC);
    assert_timeout(dev.phy_write(0x00, 0x0000), "PHY write");
    match dev.phy_read(0x00) {
        Err(Dm9000Error::Timeout { op }) => assert_eq!(op, "PHY read"),
        other => panic!("expected timeout on PHY read, got {other:?}"),
    }
}

#[test]
fn missing_tx_completion_times_out() {
    let mut dev = Dm9000::new(SimBus::with_failure(Failure::NoTxComplete), MAC);
    assert_timeout(dev.transmit(&[0x01, 0x02]), "TX completion");
}

#[test]
fn healthy_simulator_completes_every_wait() {
    let mut dev = Dm9000::new(SimBus::new(), MAC);
    dev.init().unwrap();
    dev.transmit(&[0x01, 0x02, 0x03]).unwrap();
}
