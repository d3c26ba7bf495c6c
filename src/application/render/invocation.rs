//! Argument vector handed to the renderer.
//!
//! Layout: `-c <contours> -f <kind> -i <iterations> -s <size> -t <theme>
//! <x_min> <x_max> <y_min> <y_max> [<c_x> <c_y>]`. The trailing Julia constant
//! is only present for Julia renders; the legacy `0.0 0.0` padding for
//! Mandelbrot renders is not emitted.

use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::domain::{
    params::{Fractal, RenderParameters},
    viewport::Viewport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInvocation {
    program: PathBuf,
    args: Vec<String>,
}

impl RenderInvocation {
    pub fn new(program: &Path, viewport: &Viewport, params: &RenderParameters) -> Self {
        let mut args = vec![
            "-c".to_string(),
            params.contours.to_string(),
            "-f".to_string(),
            params.fractal.code().to_string(),
            "-i".to_string(),
            params.iterations.to_string(),
            "-s".to_string(),
            params.size.to_string(),
            "-t".to_string(),
            params.theme.to_string(),
            format_coordinate(viewport.x_min()),
            format_coordinate(viewport.x_max()),
            format_coordinate(viewport.y_min()),
            format_coordinate(viewport.y_max()),
        ];

        if let Fractal::Julia { constant } = params.fractal {
            args.push(format_coordinate(constant.x()));
            args.push(format_coordinate(constant.y()));
        }

        Self {
            program: program.to_path_buf(),
            args,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Direct process invocation; arguments never pass through a shell.
    pub fn command(&self, working_dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// Shortest representation that parses back to the same `f64`.
fn format_coordinate(value: f64) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::JuliaConstant;
    use std::num::NonZeroU32;

    fn nz(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).expect("non-zero")
    }

    fn params(fractal: Fractal) -> RenderParameters {
        RenderParameters {
            fractal,
            contours: nz(32),
            theme: nz(3),
            iterations: nz(500),
            size: nz(1024),
        }
    }

    #[test]
    fn mandelbrot_arguments_follow_fixed_order() {
        let viewport = Viewport::new(-2.5, 1.0, -1.3, 1.3).expect("viewport");
        let invocation = RenderInvocation::new(
            Path::new("/opt/mandelbrot-64"),
            &viewport,
            &params(Fractal::Mandelbrot),
        );

        assert_eq!(
            invocation.args(),
            [
                "-c", "32", "-f", "1", "-i", "500", "-s", "1024", "-t", "3", "-2.5", "1.0",
                "-1.3", "1.3"
            ]
        );
    }

    #[test]
    fn julia_arguments_append_the_constant() {
        let viewport = Viewport::new(-1.5, 1.5, -1.0, 1.0).expect("viewport");
        let constant = JuliaConstant::new(-0.8, 0.156).expect("constant");
        let invocation = RenderInvocation::new(
            Path::new("mandelbrot-80"),
            &viewport,
            &params(Fractal::Julia { constant }),
        );

        let args = invocation.args();
        assert_eq!(args.len(), 16);
        assert_eq!(args[3], "2");
        assert_eq!(&args[14..], ["-0.8", "0.156"]);
    }

    #[test]
    fn coordinates_round_trip_without_precision_loss() {
        let values = [
            -0.743_643_887_037_158_7,
            1.0e-16,
            -1.234_567_890_123_456_7e-300,
            0.1 + 0.2,
        ];
        for value in values {
            let text = format_coordinate(value);
            let parsed: f64 = text.parse().expect("parse back");
            assert_eq!(parsed.to_bits(), value.to_bits(), "{text}");
        }
    }
}
