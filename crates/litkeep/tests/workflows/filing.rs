use super::*;

#[traced_test]
#[tokio::test]
async fn test_doi_in_text_files_paper() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let record = harness.serve_record(KIRILYUK_DOI, KIRILYUK_RECORD).await;
  let pdf = harness.add_pdf("download (1).pdf");
  let extractor = StubExtractor::default()
    .with_text("download (1).pdf", &format!("Foundations of Physics\nDOI {KIRILYUK_DOI}.\n"));

  let pipeline = harness.pipeline(extractor, None);
  let outcome = pipeline.process(&pdf).await;
  record.assert_async().await;

  assert_eq!(filed_key(&outcome).as_deref(), Some("kirilyuk2006complex"));

  let bibliography = std::fs::read_to_string(harness.output_file("reference.bib"))?;
  assert!(bibliography.starts_with("@article{kirilyuk2006complex,\n"));
  assert!(bibliography.contains("  title        = {Complex Structure},\n"));
  assert!(bibliography.contains("month        = jan"));
  assert!(bibliography.ends_with("}\n"));
  assert!(!bibliography.contains("Kirilyuk_2006"));

  let note = std::fs::read_to_string(harness.output_file("kirilyuk2006complex.md"))?;
  assert!(note.contains("# Complex Structure"));
  assert!(note.contains(bibliography.trim_end()));

  assert!(!pdf.exists());
  assert!(harness.input.path().join("kirilyuk2006complex.pdf").exists());
  assert!(logs_contain("Successfully processed"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_bibliography_is_appended() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _kirilyuk = harness.serve_record(KIRILYUK_DOI, KIRILYUK_RECORD).await;
  let _doe = harness.serve_record(DOE_DOI, DOE_RECORD).await;
  std::fs::write(harness.output_file("reference.bib"), "% existing library\n")?;

  let first = harness.add_pdf("first.pdf");
  let second = harness.add_pdf("second.pdf");
  let extractor = StubExtractor::default()
    .with_text("first.pdf", &format!("doi:{KIRILYUK_DOI}"))
    .with_text("second.pdf", &format!("doi:{DOE_DOI}"));
  let pipeline = harness.pipeline(extractor, None);

  assert!(pipeline.process(&first).await.is_success());
  assert!(pipeline.process(&second).await.is_success());

  let bibliography = std::fs::read_to_string(harness.output_file("reference.bib"))?;
  let kirilyuk = bibliography.find("@article{kirilyuk2006complex,").unwrap();
  let doe = bibliography.find("@article{doe2020study,").unwrap();
  assert!(bibliography.starts_with("% existing library\n"));
  assert!(kirilyuk < doe);
  assert!(harness.output_file("doe2020study.md").exists());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_empty_text_writes_nothing() -> TestResult<()> {
  let harness = Harness::new().await;
  let pdf = harness.add_pdf("scan.pdf");
  let pipeline = harness.pipeline(StubExtractor::default().with_text("scan.pdf", "  \n "), None);

  let outcome = pipeline.process(&pdf).await;
  assert_eq!(failure_reason(&outcome), Some(&FailureReason::NoTextExtracted));
  assert_eq!(outcome.to_string(), format!("{} failed: no text extracted", pdf.display()));

  assert!(pdf.exists());
  assert_eq!(std::fs::read_dir(harness.output.path())?.count(), 0);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_doi_not_found_page_fails_document() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _page = harness
    .serve_record(
      "10.1000/unknown",
      "<html><head><title>Error: DOI Not Found</title></head><body>Not found</body></html>",
    )
    .await;
  let pdf = harness.add_pdf("paper.pdf");
  let pipeline =
    harness.pipeline(StubExtractor::default().with_text("paper.pdf", "doi 10.1000/unknown"), None);

  let outcome = pipeline.process(&pdf).await;
  assert!(matches!(failure_reason(&outcome), Some(FailureReason::FetchFailed(_))));
  assert!(!harness.output_file("reference.bib").exists());
  assert!(pdf.exists());
  assert!(logs_contain("DOI 10.1000/unknown not found"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_existing_rename_target_is_kept() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _record = harness.serve_record(KIRILYUK_DOI, KIRILYUK_RECORD).await;
  let pdf = harness.add_pdf("copy.pdf");
  let existing = harness.input.path().join("kirilyuk2006complex.pdf");
  std::fs::write(&existing, "already filed")?;

  let pipeline =
    harness.pipeline(StubExtractor::default().with_text("copy.pdf", KIRILYUK_DOI), None);
  let outcome = pipeline.process(&pdf).await;

  match &outcome {
    ProcessingOutcome::Filed(paper) => assert_eq!(paper.renamed_to, None),
    ProcessingOutcome::Failed(failure) => panic!("expected success, got {}", failure.reason),
  }
  assert!(pdf.exists());
  assert_eq!(std::fs::read_to_string(&existing)?, "already filed");
  assert!(harness.output_file("kirilyuk2006complex.md").exists());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_record_without_key_is_a_failure() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _record = harness.serve_record("10.1000/keyless", "@misc{ title = {Lonely Field} }").await;
  let pdf = harness.add_pdf("keyless.pdf");
  let pipeline =
    harness.pipeline(StubExtractor::default().with_text("keyless.pdf", "10.1000/keyless"), None);

  let outcome = pipeline.process(&pdf).await;
  assert_eq!(failure_reason(&outcome), Some(&FailureReason::MissingKey));
  assert!(!harness.output_file("reference.bib").exists());
  assert!(!harness.output_file("No key found.md").exists());
  assert!(pdf.exists());
  assert!(logs_contain("No key found"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_custom_template_and_extension() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _record = harness.serve_record(DOE_DOI, DOE_RECORD).await;
  let template = harness.input.path().join("template.txt");
  std::fs::write(&template, "title: {{title}}\n{{bibtex}}\n")?;
  let pdf = harness.add_pdf("graphs.pdf");

  let mut config = harness.config().with_template(&template).with_note_extension("txt");
  config.bibliography_file = "library.bib".to_string();
  let search = RegistrySearch::from_config(&harness.registry())?;
  let pipeline = Pipeline::from_config(&config)?
    .with_extractor(StubExtractor::default().with_text("graphs.pdf", DOE_DOI))
    .with_identifier_resolver(IdentifierResolver::new(TitleExtractor::Unconfigured, search));

  assert!(pipeline.process(&pdf).await.is_success());
  let note = std::fs::read_to_string(harness.output_file("doe2020study.txt"))?;
  assert!(note.starts_with("title: A Study of Graphs\n@article{doe2020study,"));
  assert!(harness.output_file("library.bib").exists());
  assert!(!harness.output_file("reference.bib").exists());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_unwritable_output_fails_each_document() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _kirilyuk = harness.serve_record(KIRILYUK_DOI, KIRILYUK_RECORD).await;
  let _doe = harness.serve_record(DOE_DOI, DOE_RECORD).await;
  let blocker = harness.output_file("blocker");
  std::fs::write(&blocker, "a file, not a directory")?;

  let first = harness.add_pdf("first.pdf");
  let second = harness.add_pdf("second.pdf");
  let extractor = StubExtractor::default()
    .with_text("first.pdf", KIRILYUK_DOI)
    .with_text("second.pdf", DOE_DOI);
  let search = RegistrySearch::from_config(&harness.registry())?;
  let pipeline = Pipeline::from_config(&harness.config().with_output_dir(blocker.join("out")))?
    .with_extractor(extractor)
    .with_identifier_resolver(IdentifierResolver::new(TitleExtractor::Unconfigured, search));

  let summary = pipeline.run([&first, &second]).await;
  assert_eq!((summary.total, summary.succeeded), (2, 0));
  for failure in &summary.failures {
    assert!(matches!(failure.reason, FailureReason::Persistence(_)), "{}", failure.reason);
  }

  assert!(first.exists());
  assert!(second.exists());
  assert!(!harness.input.path().join("kirilyuk2006complex.pdf").exists());
  assert!(!harness.input.path().join("doe2020study.pdf").exists());
  assert_eq!(std::fs::read_to_string(&blocker)?, "a file, not a directory");
  assert!(logs_contain("Processing completed: 0/2 successful (0.0%)"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_failed_rename_still_files_paper() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _doe = harness.serve_record(DOE_DOI, DOE_RECORD).await;
  let vanished = harness.input.path().join("vanished.pdf");

  let pipeline =
    harness.pipeline(StubExtractor::default().with_text("vanished.pdf", DOE_DOI), None);
  let outcome = pipeline.process(&vanished).await;

  match &outcome {
    ProcessingOutcome::Filed(paper) => {
      assert_eq!(paper.key.as_str(), "doe2020study");
      assert_eq!(paper.renamed_to, None);
    },
    ProcessingOutcome::Failed(failure) => panic!("expected success, got {}", failure.reason),
  }
  assert!(harness.output_file("reference.bib").exists());
  assert!(harness.output_file("doe2020study.md").exists());
  assert!(!harness.input.path().join("doe2020study.pdf").exists());
  assert!(logs_contain("Failed to rename PDF file"));
  Ok(())
}
