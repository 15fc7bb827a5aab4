use std::f64::consts::PI;

use uom::si::{
    f64::{Length, MassRate, ThermalConductivity},
    length::meter,
    mass_rate::kilogram_per_second,
    thermal_conductivity::watt_per_meter_kelvin,
};

use super::{FluidProperties, ResistanceError, ResistanceModel, ResistanceState};

const LAMINAR_RE: f64 = 2300.0;
const TURBULENT_RE: f64 = 4000.0;
const LAMINAR_NU: f64 = 3.66;

/// Dimensions and conductivities of a single U-tube borehole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UTubeLayout {
    pub borehole_radius: Length,
    pub pipe_inner_radius: Length,
    pub pipe_outer_radius: Length,
    /// Distance from the borehole axis to each pipe axis.
    pub shank_spacing: Length,
    pub pipe_conductivity: ThermalConductivity,
    pub grout_conductivity: ThermalConductivity,
    pub ground_conductivity: ThermalConductivity,
    /// Mass flow rate through one borehole.
    pub mass_flow_rate: MassRate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Layout {
    r_b: f64,
    r_pi: f64,
    r_po: f64,
    x_c: f64,
    k_p: f64,
    k_g: f64,
    k_s: f64,
    m_dot: f64,
}

/// Single U-tube borehole resistance from the zeroth-order multipole
/// solution, corrected for short-circuiting between the two legs.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleUTube<F> {
    layout: Layout,
    fluid: F,
}

impl<F: FluidProperties> SingleUTube<F> {
    /// Creates a validated U-tube model.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension or conductivity is not positive, the
    /// pipe wall has no thickness, or the pipes overlap or leave the borehole.
    pub fn new(fluid: F, layout: UTubeLayout) -> Result<Self, ResistanceError> {
        let layout = Layout {
            r_b: layout.borehole_radius.get::<meter>(),
            r_pi: layout.pipe_inner_radius.get::<meter>(),
            r_po: layout.pipe_outer_radius.get::<meter>(),
            x_c: layout.shank_spacing.get::<meter>(),
            k_p: layout.pipe_conductivity.get::<watt_per_meter_kelvin>(),
            k_g: layout.grout_conductivity.get::<watt_per_meter_kelvin>(),
            k_s: layout.ground_conductivity.get::<watt_per_meter_kelvin>(),
            m_dot: layout.mass_flow_rate.get::<kilogram_per_second>(),
        };
        for (name, value) in [
            ("borehole radius", layout.r_b),
            ("pipe inner radius", layout.r_pi),
            ("pipe outer radius", layout.r_po),
            ("shank spacing", layout.x_c),
            ("pipe conductivity", layout.k_p),
            ("grout conductivity", layout.k_g),
            ("ground conductivity", layout.k_s),
            ("mass flow rate", layout.m_dot),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ResistanceError::InvalidParameter { name, value });
            }
        }
        if layout.r_pi >= layout.r_po {
            return Err(ResistanceError::Layout("inner pipe radius must be below outer"));
        }
        if layout.x_c < layout.r_po {
            return Err(ResistanceError::Layout("pipes overlap"));
        }
        if layout.x_c + layout.r_po > layout.r_b {
            return Err(ResistanceError::Layout("pipes extend outside the borehole"));
        }
        Ok(Self { layout, fluid })
    }

    /// Fluid-to-pipe-outer-wall resistance of one pipe and the Reynolds number.
    fn pipe_resistance(&self, temperature: f64) -> Result<(f64, f64), ResistanceError> {
        let l = &self.layout;
        let fluid = self.fluid.state(temperature)?;
        let reynolds = 2.0 * l.m_dot / (PI * l.r_pi * fluid.viscosity);
        let nusselt = nusselt(reynolds, fluid.prandtl());
        let h = nusselt * fluid.conductivity / (2.0 * l.r_pi);
        let conduction = (l.r_po / l.r_pi).ln() / (2.0 * PI * l.k_p);
        let convection = 1.0 / (2.0 * PI * l.r_pi * h);
        Ok((conduction + convection, reynolds))
    }

    /// Local borehole resistance `Rb` and internal resistance `Ra` in m·K/W.
    ///
    /// # Errors
    ///
    /// Returns an error if the fluid properties cannot be evaluated.
    pub fn resistances(&self, temperature: f64) -> Result<(f64, f64), ResistanceError> {
        let l = &self.layout;
        let (r_p, _) = self.pipe_resistance(temperature)?;
        let sigma = (l.k_g - l.k_s) / (l.k_g + l.k_s);

        let rb = r_p / 2.0
            + ((l.r_b / l.r_po).ln()
                + (l.r_b / (2.0 * l.x_c)).ln()
                + sigma * (l.r_b.powi(4) / (l.r_b.powi(4) - l.x_c.powi(4))).ln())
                / (4.0 * PI * l.k_g);
        let ra = 2.0 * r_p
            + ((2.0 * l.x_c / l.r_po).ln()
                + sigma * ((l.r_b.powi(2) + l.x_c.powi(2)) / (l.r_b.powi(2) - l.x_c.powi(2))).ln())
                / (PI * l.k_g);
        Ok((rb, ra))
    }

    /// Reynolds number of the flow in one leg.
    ///
    /// # Errors
    ///
    /// Returns an error if the fluid properties cannot be evaluated.
    pub fn reynolds(&self, temperature: f64) -> Result<f64, ResistanceError> {
        self.pipe_resistance(temperature).map(|(_, re)| re)
    }
}

impl<F: FluidProperties> ResistanceModel for SingleUTube<F> {
    fn effective_resistance(&self, state: &ResistanceState) -> Result<f64, ResistanceError> {
        let (rb, ra) = self.resistances(state.fluid_temperature)?;
        let fluid = self.fluid.state(state.fluid_temperature)?;
        let eta = state.depth / (self.layout.m_dot * fluid.heat_capacity * (ra * rb).sqrt());
        if eta <= 0.0 || !eta.is_finite() {
            return Ok(rb);
        }
        Ok(rb * eta / eta.tanh())
    }

    fn depends_on_temperature(&self) -> bool {
        self.fluid.depends_on_temperature()
    }
}

/// Nusselt number for fully developed pipe flow, blended linearly between the
/// laminar value and Gnielinski in the transition region.
fn nusselt(reynolds: f64, prandtl: f64) -> f64 {
    let gnielinski = |re: f64| {
        let f = (0.79 * re.ln() - 1.64).powi(-2);
        (f / 8.0) * (re - 1000.0) * prandtl
            / (1.0 + 12.7 * (f / 8.0).sqrt() * (prandtl.powf(2.0 / 3.0) - 1.0))
    };
    if reynolds < LAMINAR_RE {
        LAMINAR_NU
    } else if reynolds >= TURBULENT_RE {
        gnielinski(reynolds)
    } else {
        let w = (reynolds - LAMINAR_RE) / (TURBULENT_RE - LAMINAR_RE);
        (1.0 - w) * LAMINAR_NU + w * gnielinski(TURBULENT_RE)
    }
}
