// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
//   1. `train`    — trains the gaze network on an annotation file
//   2. `predict`  — predicts one head's gaze direction
//   3. `evaluate` — scores a trained run on an annotation file
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};
use crate::domain::annotation::HeadBox;

#[derive(Parser, Debug)]
#[command(
    name = "gaze-direction",
    version = "0.1.0",
    about = "Train a ResNet gaze-direction network on annotated head crops, then predict."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; this layer only routes and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => Self::run_train(args),
            Commands::Predict(args)  => Self::run_predict(args),
            Commands::Evaluate(args) => Self::run_evaluate(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on '{}{}'", args.root_dir, args.ann_file);

        let run_dir = TrainUseCase::new(args.into()).execute()?;

        println!("Training complete. Run saved to '{}'.", run_dir.display());
        Ok(())
    }

    fn run_predict(args: PredictArgs) -> Result<()> {
        use crate::application::predict_use_case::PredictUseCase;

        let use_case  = PredictUseCase::new(&args.run_dir)?;
        let head_box  = HeadBox::new(args.x_init, args.y_init, args.w, args.h);
        let direction = use_case.predict(Path::new(&args.image), head_box, [args.head_x, args.head_y])?;

        let angle = direction.y.atan2(direction.x).to_degrees();
        println!(
            "\nGaze direction: ({:.4}, {:.4})  angle={:.1}° (image coords, y down)",
            direction.x, direction.y, angle
        );
        Ok(())
    }

    fn run_evaluate(args: EvaluateArgs) -> Result<()> {
        use crate::application::predict_use_case::EvaluateUseCase;

        let use_case          = EvaluateUseCase::new(&args.run_dir)?;
        let (samples, report) = use_case.evaluate(&args.root_dir, &args.ann_file)?;

        println!(
            "\nEvaluated {} heads | mean_loss={:.4} | mean_angle={:.2}°",
            samples, report.mean_loss, report.mean_angle_deg
        );
        Ok(())
    }
}
