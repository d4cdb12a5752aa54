use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, Tensor, TypedFact, TypedOp, tvec,
};

type RunnablePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Narrow execution contract the rest of the pipeline depends on.
///
/// The analyzer only needs "run the network on a preprocessed tensor and hand
/// back the flattened activations", so that is the whole trait. Tests inject
/// scripted backends through it.
pub trait InferenceBackend: Send + Sync + std::fmt::Debug {
    /// Run inference and return the first output tensor flattened to `f32`.
    fn infer(&self, input: &Tensor) -> Result<Vec<f32>>;
}

/// Wrapper around a runnable ONNX saliency network.
///
/// This struct handles loading the ONNX graph, preparing it for execution,
/// and running inference.
#[derive(Debug)]
pub struct SaliencyModel {
    runnable: RunnablePlan,
}

impl SaliencyModel {
    /// Load and optimize an ONNX graph.
    ///
    /// Falls back to a decluttered (unoptimized) plan when the optimized load
    /// fails, which keeps unusual exported graphs usable at reduced speed.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable_plan(path, true) {
            Ok(plan) => {
                debug!("model {} optimized successfully", path.display());
                plan
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "model {} failed optimized load ({}); falling back to decluttered graph (~2x slower).\nError chain:\n{}",
                    path.display(),
                    optimize_msg,
                    chain_msg.trim_end()
                );
                let decluttered = load_runnable_plan(path, false).with_context(|| {
                    format!(
                        "fallback to decluttered graph failed after optimize error: {optimize_msg}"
                    )
                })?;
                debug!("model {} running in decluttered mode", path.display());
                decluttered
            }
        };

        Ok(Self { runnable })
    }
}

impl InferenceBackend for SaliencyModel {
    /// Execute the network and flatten its first output to raw activations.
    ///
    /// The saliency network emits a `H x W` activation grid; the generic
    /// fallback classifier emits a logit vector. Downstream extraction reads
    /// both as a flat buffer, so no shape is enforced here.
    fn infer(&self, input: &Tensor) -> Result<Vec<f32>> {
        let outputs = self
            .runnable
            .run(tvec![input.clone().into()])
            .map_err(|e| anyhow::anyhow!("model execution failed: {e}"))?;

        let tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("model produced no outputs"))?
            .into_tensor();

        let activations = tensor
            .as_slice::<f32>()
            .map_err(|e| anyhow::anyhow!("model output is not f32: {e}"))?;
        Ok(activations.to_vec())
    }
}

fn load_runnable_plan(path: &Path, optimized: bool) -> Result<RunnablePlan> {
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make graph runnable: {e}"))
    }
}
