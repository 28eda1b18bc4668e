use crate::error::Result;
use crate::caps::DeviceCaps;
use crate::report::Frame;

/// Outcome of one blocking read on a [`ReportSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// A full report was decoded into the frame.
    Report,
    /// The read was interrupted by [`Interrupt::interrupt`].
    Cancelled,
}

/// Handle that unblocks a pending [`ReportSource::read_frame`] from another
/// thread.
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// Blocking report stream of one opened gamepad.
///
/// The poll thread owns the source exclusively; the only cross-thread entry
/// point is the [`Interrupt`] handle. Dropping the source closes the device.
pub trait ReportSource: Send {
    /// Descriptor capabilities, parsed once at open time.
    fn caps(&self) -> Result<DeviceCaps>;

    /// Blocks until the device produces an input report, then decodes it
    /// into `frame`. Returns [`ReadStatus::Cancelled`] when interrupted.
    fn read_frame(&mut self, frame: &mut Frame) -> Result<ReadStatus>;

    /// Handle for cancelling a read in progress.
    fn interrupter(&self) -> Box<dyn Interrupt>;
}
