use pz_core::{
    analyze_rational as core_analyze, NullSink, PoleZeroRunner, PoleZeroSettings,
    PolynomialOracle, RationalFunction,
};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

type RationalRunner = PoleZeroRunner<PolynomialOracle, PolynomialOracle>;

/// Pole-zero analysis of a rational transfer function, advanced in batches.
///
/// Coefficients are ascending powers of `s`.
#[wasm_bindgen]
pub struct WasmPoleZeroRunner {
    runner: RationalRunner,
}

#[wasm_bindgen]
impl WasmPoleZeroRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        numerator: Vec<f64>,
        denominator: Vec<f64>,
        settings: JsValue,
    ) -> Result<WasmPoleZeroRunner, JsValue> {
        console_error_panic_hook::set_once();

        let settings = parse_settings(settings)?;
        let runner = build_runner(numerator, denominator, &settings)
            .map_err(|e| JsValue::from_str(&format!("{}", e)))?;
        Ok(WasmPoleZeroRunner { runner })
    }

    pub fn is_done(&self) -> bool {
        self.runner.is_done()
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        for _ in 0..batch_size {
            let done = self
                .runner
                .step(&mut NullSink)
                .map_err(|e| JsValue::from_str(&format!("Pole-zero analysis failed: {}", e)))?;
            if done {
                break;
            }
        }
        self.get_progress()
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        to_value(&self.runner.progress())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let result = self
            .runner
            .result()
            .ok_or_else(|| JsValue::from_str("Analysis has not finished"))?;
        to_value(&result).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

/// Runs a full pole-zero analysis in one call.
#[wasm_bindgen]
pub fn analyze_rational(
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let settings = parse_settings(settings)?;
    let h = build_rational(numerator, denominator)
        .map_err(|e| JsValue::from_str(&format!("{}", e)))?;
    let result = core_analyze(&h, &settings, &mut NullSink)
        .map_err(|e| JsValue::from_str(&format!("Pole-zero analysis failed: {}", e)))?;
    to_value(&result).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn parse_settings(settings: JsValue) -> Result<PoleZeroSettings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(PoleZeroSettings::default());
    }
    from_value(settings).map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))
}

fn build_rational(numerator: Vec<f64>, denominator: Vec<f64>) -> anyhow::Result<RationalFunction> {
    if numerator.is_empty() || denominator.is_empty() {
        anyhow::bail!("Numerator and denominator need at least one coefficient.");
    }
    RationalFunction::from_coefficients(numerator, denominator)
}

fn build_runner(
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    settings: &PoleZeroSettings,
) -> anyhow::Result<RationalRunner> {
    let h = build_rational(numerator, denominator)?;
    Ok(PoleZeroRunner::new(h.pole_oracle(), h.zero_oracle(), settings)?)
}
