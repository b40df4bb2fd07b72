//! Writing evaluated datasets to CSV and Parquet

use std::fs::File;

use arrow::array::{Array, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use cohort_def::models::{ClinicalEvent, TestResult};
use cohort_def::rules::{CategorySource, Returning, TestFilter, TestResultFilter};
use cohort_def::{Dataset, DateExpr, Rule, RuleSet, SourceRule};

use crate::utils::{adult, build, date, evaluate, test_registry};

fn sample_dataset() -> Dataset {
    let registry = test_registry();
    let rules = build(
        RuleSet::builder()
            .variable(
                "covid_test_positive",
                SourceRule::test_results(TestFilter::sars_cov_2(TestResultFilter::Positive)),
            )
            .variable(
                "covid_test_positive_date",
                SourceRule::test_results(TestFilter::sars_cov_2(TestResultFilter::Positive))
                    .on_or_after(DateExpr::index())
                    .returning_date(),
            )
            .variable(
                "ethnicity",
                SourceRule::clinical_events(registry.get("ethnicity").unwrap())
                    .returning_category(CategorySource::Codelist),
            )
            .variable("age", Rule::age_as_of(DateExpr::index()))
            .variable(
                "weight",
                SourceRule::clinical_events(registry.get("weight").unwrap())
                    .find_last()
                    .returning(Returning::NumericValue),
            ),
    );

    let recorded = adult(1)
        .with_test_result(TestResult::covid_positive(date(2022, 1, 5)))
        .with_clinical_event(ClinicalEvent::new(date(2011, 2, 3), "92491000000104"))
        .with_clinical_event(ClinicalEvent::new(date(2021, 3, 4), "27113001").with_value(72.5));
    evaluate(rules, &[recorded, adult(2)])
}

#[test]
fn test_csv_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output/input.csv");
    sample_dataset().write_csv(&path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(
        headers,
        [
            "patient_id",
            "covid_test_positive",
            "covid_test_positive_date",
            "ethnicity",
            "age",
            "weight"
        ]
    );

    let records: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], ["1", "1", "2022-01-05", "3", "51", "72.5"]);
    assert_eq!(records[1], ["2", "0", "", "", "51", ""]);
}

#[test]
fn test_parquet_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.parquet");
    sample_dataset().write_parquet(&path).unwrap();

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 2);

    let schema = batch.schema();
    assert_eq!(schema.field(1).data_type(), &DataType::Boolean);
    assert_eq!(schema.field(2).data_type(), &DataType::Date32);
    assert_eq!(schema.field(3).data_type(), &DataType::Utf8);
    assert_eq!(schema.field(4).data_type(), &DataType::Int64);
    assert_eq!(schema.field(5).data_type(), &DataType::Float64);

    let flags = batch.column(1).as_any().downcast_ref::<BooleanArray>().unwrap();
    assert!(flags.value(0));
    assert!(!flags.value(1));

    let dates = batch.column(2).as_any().downcast_ref::<Date32Array>().unwrap();
    assert_eq!(dates.value_as_date(0), Some(date(2022, 1, 5)));
    assert!(dates.is_null(1));

    let ethnicity = batch.column(3).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(ethnicity.value(0), "3");
    assert!(ethnicity.is_null(1));

    let age = batch.column(4).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(age.value(1), 51);

    let weight = batch.column(5).as_any().downcast_ref::<Float64Array>().unwrap();
    assert!((weight.value(0) - 72.5).abs() < f64::EPSILON);
    assert!(weight.is_null(1));
}
