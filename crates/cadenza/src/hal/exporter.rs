use cadenza_core::{
    AxisFlags, HardwareBoundary, MotionEvent, Result, Trajectory,
    trajectory::{Direction, Directions},
};
use std::io::Write;
use tracing::info;

/// Writes every motion event as one text line for offline inspection:
///
/// ```text
/// dir X+ Y- Z+ E+
/// step 0.012345 XY
/// pos 0.040000 1.000 2.000 0.000 0.000
/// ```
///
/// Non-motion calls are logged only.
pub struct FileExporter<W: Write> {
    writer: W,
}

impl<W: Write> FileExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: &MotionEvent) -> std::io::Result<()> {
        match event {
            MotionEvent::Direction(dirs) => writeln!(self.writer, "dir {}", format_dirs(dirs)),
            MotionEvent::Step { time_s, axes } => {
                writeln!(self.writer, "step {time_s:.6} {axes}")
            }
            MotionEvent::Sample { time_s, position } => writeln!(
                self.writer,
                "pos {time_s:.6} {:.3} {:.3} {:.3} {:.3}",
                position.x, position.y, position.z, position.e
            ),
        }
    }
}

fn format_dirs(dirs: &Directions) -> String {
    let sign = |d: Direction| match d {
        Direction::Forward => '+',
        Direction::Reverse => '-',
    };
    format!(
        "X{} Y{} Z{} E{}",
        sign(dirs.x),
        sign(dirs.y),
        sign(dirs.z),
        sign(dirs.e)
    )
}

impl<W: Write> HardwareBoundary for FileExporter<W> {
    fn init(&mut self) -> Result<()> {
        info!("exporter ready");
        Ok(())
    }

    fn move_along(&mut self, trajectory: Trajectory) -> Result<()> {
        for event in trajectory {
            self.write_event(&event)?;
        }
        Ok(())
    }

    fn join(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn spindle_control(&mut self, percent: f64) -> Result<()> {
        info!("spindle control: {percent}%");
        Ok(())
    }

    fn fan_control(&mut self, on: bool) -> Result<()> {
        info!("fan is {}", if on { "on" } else { "off" });
        Ok(())
    }

    fn disable_steppers(&mut self) -> Result<()> {
        Ok(())
    }

    fn calibrate(&mut self, _axes: AxisFlags) -> Result<bool> {
        Ok(true)
    }

    fn deinit(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::{Coordinates, MachineConfig, config::EmissionMode};

    fn export(config: &MachineConfig, delta: Coordinates, feed: f64) -> String {
        let mut exporter = FileExporter::new(Vec::new());
        let trajectory = Trajectory::new(delta, delta, feed, config).unwrap();
        exporter.move_along(trajectory).unwrap();
        exporter.deinit().unwrap();
        String::from_utf8(exporter.into_inner()).unwrap()
    }

    #[test]
    fn pulse_lines() {
        let text = export(
            &MachineConfig::default(),
            Coordinates::new(0.02, -0.01, 0.0, 0.0),
            600.0,
        );
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("dir X+ Y- Z+ E+"));
        let steps: Vec<_> = lines.collect();
        assert_eq!(steps.len(), 2);
        // Y steps together with the second X pulse
        assert!(steps[0].starts_with("step ") && steps[0].ends_with(" X"));
        assert!(steps[1].ends_with(" XY"));
    }

    #[test]
    fn sample_lines() {
        let config = MachineConfig {
            emission: EmissionMode::Samples,
            ..MachineConfig::default()
        };
        let text = export(&config, Coordinates::new(1.0, 2.0, 0.0, 0.0), 6000.0);
        insta::assert_snapshot!(text.lines().last().unwrap(), @"pos 0.051640 1.000 2.000 0.000 0.000");
    }
}
