use ghe_core::Model;

use crate::{
    Error,
    gfunction::GFunctionOracle,
    load::Resolution,
    setup::Quadrant,
    temperature::Simulator,
};

use super::problem::Reading;

/// Full monthly or hourly simulation at a trial depth.
pub(crate) struct ConvolutionModel<'s, 'a, O: ?Sized> {
    pub simulator: &'s Simulator<'a, O>,
    pub resolution: Resolution,
}

impl<O: GFunctionOracle + ?Sized> Model for ConvolutionModel<'_, '_, O> {
    type Input = f64;
    type Output = Reading;
    type Error = Error;

    fn call(&self, depth: &f64) -> Result<Reading, Error> {
        self.simulator.run(*depth, self.resolution).map(Reading::Full)
    }
}

/// Three-pulse estimate of the fluid temperature watched by a quadrant.
pub(crate) struct PulseModel<'s, 'a, O: ?Sized> {
    pub simulator: &'s Simulator<'a, O>,
    pub quadrant: Quadrant,
}

impl<O: GFunctionOracle + ?Sized> Model for PulseModel<'_, '_, O> {
    type Input = f64;
    type Output = Reading;
    type Error = Error;

    fn call(&self, depth: &f64) -> Result<Reading, Error> {
        Ok(Reading::Point {
            ground_temperature: self.simulator.ground_temperature(*depth),
            temperature: self.simulator.pulses(*depth, self.quadrant)?,
            resistance: self.simulator.resistance(*depth)?,
        })
    }
}

/// Hourly fluid temperature at one presumed critical hour.
pub(crate) struct CriticalHourModel<'s, 'a, O: ?Sized> {
    pub simulator: &'s Simulator<'a, O>,
    pub hour: usize,
}

impl<O: GFunctionOracle + ?Sized> Model for CriticalHourModel<'_, '_, O> {
    type Input = f64;
    type Output = Reading;
    type Error = Error;

    fn call(&self, depth: &f64) -> Result<Reading, Error> {
        Ok(Reading::Point {
            ground_temperature: self.simulator.ground_temperature(*depth),
            temperature: self.simulator.hourly_at(*depth, self.hour)?,
            resistance: self.simulator.resistance(*depth)?,
        })
    }
}
