//! Runs both study definitions against synthetic patients
//!
//! Codelists and patients are generated, so this needs no data. The treatment cohort is
//! written to the system temp directory as CSV and Parquet.

use std::time::Instant;

use cohort_def::utils::logging::{
    print_dataset_summary, print_sample_rows, print_schema_info, print_study_report, spinner,
};
use cohort_def::{DummyConfig, DummyDataGenerator, Result, Study, StudyConfig, dummy_registry};
use log::info;

const PATIENTS: usize = 2_000;

fn main() -> Result<()> {
    cohort_def::utils::init_logging();

    let config = StudyConfig::default();
    info!("{config}");

    let pb = spinner("Building synthetic codelists");
    let registry = dummy_registry()?;
    pb.finish_and_clear();

    let patients =
        DummyDataGenerator::new(&registry, &config, DummyConfig::default()).generate(PATIENTS, true);

    for name in Study::names() {
        let study = Study::by_name(name, &registry, config.clone())?;
        println!("\n== {name}: {} variables ==", study.rules.len());

        let start = Instant::now();
        let run = study.run(&patients)?;
        print_dataset_summary(&run.cohort, start.elapsed());
        print_schema_info(&run.cohort);
        print_sample_rows(&run.cohort, 3);
        print_study_report(&run.report, &run.cohort);

        let out = std::env::temp_dir().join("cohort-def");
        run.cohort.write_csv(&out.join(format!("{name}.csv")))?;
        run.cohort.write_parquet(&out.join(format!("{name}.parquet")))?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}
