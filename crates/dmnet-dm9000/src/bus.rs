//! The MMIO register port: an address-select/data register pair.
//!
//! The DM9000 exposes its whole register file through two memory-mapped cells: software writes a
//! register offset to the index cell, waits a few bus-settle cycles, then reads or writes the
//! data cell. [`RegisterIo`] captures exactly that capability so the driver can run against
//! either real hardware ([`MmioRegisterIo`]) or a simulated register file
//! ([`crate::sim::SimBus`]).

/// Raw register access. Infallible by design: a non-responding device cannot be detected at this
/// level and instead shows up as a bounded poll timing out in the driver above.
///
/// Not thread-safe; the driver assumes a single control thread.
pub trait RegisterIo {
    fn read(&mut self, reg: u8) -> u16;

    fn write(&mut self, reg: u8, value: u16);

    /// Busy-wait for roughly `us` microseconds. Simulated buses leave this a no-op.
    fn delay_us(&mut self, _us: u32) {}
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn read(&mut self, reg: u8) -> u16 {
        <T as RegisterIo>::read(&mut **self, reg)
    }

    fn write(&mut self, reg: u8, value: u16) {
        <T as RegisterIo>::write(&mut **self, reg, value)
    }

    fn delay_us(&mut self, us: u32) {
        <T as RegisterIo>::delay_us(&mut **self, us)
    }
}

/// Volatile accesses against the real index/data pair.
///
/// The settle constants are in spin-loop iterations, tuned for the slow external bus the DM9000
/// hangs off; they are deliberately generous rather than calibrated.
pub struct MmioRegisterIo {
    index: *mut u32,
    data: *mut u32,
}

/// Spin-loop iterations per microsecond of requested delay.
const SPINS_PER_US: u32 = 16;
const SETTLE_READ: u32 = 48;
const SETTLE_WRITE: u32 = 16;

fn settle(spins: u32) {
    for _ in 0..spins {
        core::hint::spin_loop();
    }
}

impl MmioRegisterIo {
    /// # Safety
    ///
    /// `index_addr` and `data_addr` must be the mapped addresses of the device's index and data
    /// cells, valid for volatile reads and writes for the lifetime of the returned value, and
    /// not accessed from any other thread.
    pub unsafe fn new(index_addr: usize, data_addr: usize) -> Self {
        Self {
            index: index_addr as *mut u32,
            data: data_addr as *mut u32,
        }
    }
}

impl RegisterIo for MmioRegisterIo {
    fn read(&mut self, reg: u8) -> u16 {
        unsafe {
            core::ptr::write_volatile(self.index, u32::from(reg));
            settle(SETTLE_READ);
            core::ptr::read_volatile(self.data) as u16
        }
    }

    fn write(&mut self, reg: u8, value: u16) {
        unsafe {
            core::ptr::write_volatile(self.index, u32::from(reg));
            settle(SETTLE_WRITE);
            core::ptr::write_volatile(self.data, u32::from(value));
            settle(SETTLE_WRITE);
        }
    }

    fn delay_us(&mut self, us: u32) {
        settle(us.saturating_mul(SPINS_PER_US));
    }
}
