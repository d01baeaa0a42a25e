//! Transmit and receive data paths against the simulated SRAM FIFOs.

use dmnet_backend::FrameIo;
use dmnet_dm9000::regs::{RSR_CE, TSR_NC};
use dmnet_dm9000::sim::SimBus;
use dmnet_dm9000::{Dm9000, Dm9000Error, RxOutcome, MAX_FRAME_LEN};

const MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

fn device() -> Dm9000<SimBus> {
    Dm9000::new(SimBus::new(), MAC)
}

#[test]
fn transmit_streams_frame_as_words() {
    let mut dev = device();
    let frame = [0x10, 0x20, 0x30, 0x40];
    dev.transmit(&frame).unwrap();

    let sim = dev.bus_mut();
    assert_eq!(sim.transmitted(), &[frame.to_vec()]);
    assert_eq!(sim.last_tx_stream_len(), 4);
}

#[test]
fn odd_length_transmit_pads_stream_but_not_declared_length() {
    let mut dev = device();
    dev.transmit(&[0xaa, 0xbb, 0xcc]).unwrap();

    let sim = dev.bus_mut();
    // Three bytes on the wire, four streamed into SRAM (trailing zero pad word half).
    assert_eq!(sim.transmitted(), &[vec![0xaa, 0xbb, 0xcc]]);
    assert_eq!(sim.last_tx_stream_len(), 4);
}

#[test]
fn oversized_frame_is_rejected_before_touching_hardware() {
    let mut dev = device();
    let frame = vec![0u8; MAX_FRAME_LEN + 1];
    match dev.transmit(&frame) {
        Err(Dm9000Error::FrameTooLarge { len, max }) => {
            assert_eq!(len, MAX_FRAME_LEN + 1);
            assert_eq!(max, MAX_FRAME_LEN);
        }
        other => panic!("expected FrameTooLarge, got {other:?}"),
    }
    assert!(dev.bus_mut().transmitted().is_empty());
}

#[test]
fn max_length_frame_transmits() {
    let mut dev = device();
    let frame = vec![0x5a; MAX_FRAME_LEN];
    dev.transmit(&frame).unwrap();
    assert_eq!(dev.bus_mut().transmitted(), &[frame]);
}

#[test]
fn tx_error_status_surfaces() {
    let mut dev = device();
    dev.bus_mut().set_tx_status(TSR_NC);
    match dev.transmit(&[0x01, 0x02]) {
        Err(Dm9000Error::TxFailed { tsr }) => assert_eq!(tsr, TSR_NC),
        other => panic!("expected TxFailed, got {other:?}"),
    }
}

#[test]
fn receive_returns_empty_when_nothing_pending() {
    let mut dev = device();
    assert_eq!(dev.receive(), RxOutcome::Empty);
    // Polling while idle must not consume anything or wedge the FIFO.
    assert_eq!(dev.receive(), RxOutcome::Empty);
}

#[test]
fn receive_extracts_injected_frame() {
    let mut dev = device();
    let frame = [0xde, 0xad, 0xbe, 0xef, 0x99];
    dev.bus_mut().inject_frame(&frame, 0x00);

    match dev.receive() {
        RxOutcome::Frame(got) => assert_eq!(got, frame),
        other => panic!("expected frame, got {other:?}"),
    }
    assert_eq!(dev.receive(), RxOutcome::Empty);
}

#[test]
fn back_to_back_frames_come_out_in_order() {
    let mut dev = device();
    dev.bus_mut().inject_frame(&[0x01, 0x02], 0x00);
    dev.bus_mut().inject_frame(&[0x03, 0x04, 0x05], 0x00);

    assert_eq!(dev.receive(), RxOutcome::Frame(&[0x01, 0x02]));
    assert_eq!(dev.receive(), RxOutcome::Frame(&[0x03, 0x04, 0x05]));
    assert_eq!(dev.receive(), RxOutcome::Empty);
}

#[test]
fn errored_frame_is_drained_and_dropped() {
    let mut dev = device();
    dev.bus_mut().inject_frame(&[0xff; 9], RSR_CE);
    dev.bus_mut().inject_frame(&[0x11, 0x22], 0x00);

    // The bad frame must be consumed whole so the next one is still readable.
    assert_eq!(dev.receive(), RxOutcome::Dropped { rsr: RSR_CE });
    assert_eq!(dev.receive(), RxOutcome::Frame(&[0x11, 0x22]));
}

#[test]
fn frame_io_trait_maps_outcomes() {
    let mut dev = device();
    dev.bus_mut().inject_frame(&[0xff; 4], RSR_CE);
    dev.bus_mut().inject_frame(&[0x0a, 0x0b], 0x00);

    assert_eq!(dev.poll_receive().unwrap(), None); // dropped frame
    assert_eq!(dev.poll_receive().unwrap(), Some(vec![0x0a, 0x0b]));
    assert_eq!(dev.poll_receive().unwrap(), None); // idle

    FrameIo::transmit(&mut dev, &[0x0c, 0x0d]).unwrap();
    assert_eq!(dev.bus_mut().transmitted(), &[vec![0x0c, 0x0d]]);
}
