use super::*;

#[traced_test]
#[tokio::test]
async fn test_batch_with_one_failure() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _kirilyuk = harness.serve_record(KIRILYUK_DOI, KIRILYUK_RECORD).await;
  let _doe = harness.serve_record(DOE_DOI, DOE_RECORD).await;

  harness.add_pdf("a.pdf");
  harness.add_pdf("b.pdf");
  std::fs::create_dir(harness.input.path().join("inbox"))?;
  harness.add_pdf("inbox/unidentified.pdf");

  let extractor = StubExtractor::default()
    .with_text("a.pdf", &format!("doi:{KIRILYUK_DOI}"))
    .with_text("b.pdf", &format!("https://doi.org/{DOE_DOI}"))
    .with_text("unidentified.pdf", "A paper without any identifier");
  let pipeline = harness.pipeline(extractor, None);

  let summary = pipeline.run_path(harness.input.path()).await?;
  assert_eq!((summary.total, summary.succeeded), (3, 2));
  assert_eq!(summary.failures.len(), 1);
  assert_eq!(summary.failures[0].file_name(), "unidentified.pdf");

  let report = std::fs::read_to_string(harness.output_file("failed_list.md"))?;
  assert_eq!(report, "Failed files:\n- unidentified.pdf\n");
  assert!(logs_contain("Processing completed: 2/3 successful (66.7%)"));

  assert!(harness.input.path().join("kirilyuk2006complex.pdf").exists());
  assert!(harness.input.path().join("doe2020study.pdf").exists());
  assert!(harness.input.path().join("inbox/unidentified.pdf").exists());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_batch_all_successful() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _doe = harness.serve_record(DOE_DOI, DOE_RECORD).await;
  let pdf = harness.add_pdf("graphs.pdf");

  let pipeline =
    harness.pipeline(StubExtractor::default().with_text("graphs.pdf", DOE_DOI), None);
  let summary = pipeline.run_path(&pdf).await?;

  assert_eq!((summary.total, summary.succeeded), (1, 1));
  assert_eq!(summary.filed[0].key.as_str(), "doe2020study");
  assert!(!harness.output_file("failed_list.md").exists());
  assert!(logs_contain("All 1 files processed successfully"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_non_pdf_input_is_rejected() -> TestResult<()> {
  let harness = Harness::new().await;
  let notes = harness.input.path().join("notes.txt");
  std::fs::write(&notes, "not a paper")?;

  let pipeline = harness.pipeline(StubExtractor::default(), None);
  assert!(matches!(pipeline.run_path(&notes).await, Err(LitkeepError::InputNotFound(_))));
  Ok(())
}
