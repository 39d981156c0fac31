use super::*;

#[traced_test]
#[tokio::test]
async fn test_title_lookup_when_text_has_no_doi() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let search = harness.serve_search("Complex Structure", KIRILYUK_DOI).await;
  let record = harness.serve_record(KIRILYUK_DOI, KIRILYUK_RECORD).await;
  let pdf = harness.add_pdf("preprint.pdf");
  let extractor = StubExtractor::default()
    .with_text("preprint.pdf", "Complex Structure\nA. Kirilyuk\nAbstract. We study structure.");

  let pipeline = harness.pipeline(extractor, Some(StubModel("  Complex Structure\n")));
  let outcome = pipeline.process(&pdf).await;

  search.assert_async().await;
  record.assert_async().await;
  assert_eq!(filed_key(&outcome).as_deref(), Some("kirilyuk2006complex"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_no_doi_and_no_language_model() -> TestResult<()> {
  let harness = Harness::new().await;
  let pdf = harness.add_pdf("preprint.pdf");
  let pipeline =
    harness.pipeline(StubExtractor::default().with_text("preprint.pdf", "Some Title"), None);

  let outcome = pipeline.process(&pdf).await;
  assert!(matches!(failure_reason(&outcome), Some(FailureReason::TitleUnavailable(_))));
  assert!(logs_contain("Failed to extract title"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_language_model_failure_sentinel() -> TestResult<()> {
  let harness = Harness::new().await;
  let pdf = harness.add_pdf("preprint.pdf");
  let pipeline = harness.pipeline(
    StubExtractor::default().with_text("preprint.pdf", "Garbled text"),
    Some(StubModel("Failed to extract title")),
  );

  let outcome = pipeline.process(&pdf).await;
  assert!(matches!(failure_reason(&outcome), Some(FailureReason::TitleUnavailable(_))));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_title_without_registry_match() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let _search = harness
    .server
    .mock("GET", "/works")
    .match_query(Matcher::Any)
    .with_status(200)
    .with_body(r#"{"message": {"items": []}}"#)
    .create_async()
    .await;
  let pdf = harness.add_pdf("obscure.pdf");
  let pipeline = harness.pipeline(
    StubExtractor::default().with_text("obscure.pdf", "An Obscure Paper"),
    Some(StubModel("An Obscure Paper")),
  );

  let outcome = pipeline.process(&pdf).await;
  assert_eq!(
    failure_reason(&outcome),
    Some(&FailureReason::DoiNotResolved("An Obscure Paper".to_string()))
  );
  assert!(logs_contain("No DOI found for title: An Obscure Paper"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_rate_limited_search_fails_document() -> TestResult<()> {
  let mut harness = Harness::new().await;
  let search = harness
    .server
    .mock("GET", "/works")
    .match_query(Matcher::Any)
    .with_status(429)
    .expect(1)
    .create_async()
    .await;
  let pdf = harness.add_pdf("busy.pdf");
  let pipeline = harness.pipeline(
    StubExtractor::default().with_text("busy.pdf", "Busy Paper"),
    Some(StubModel("Busy Paper")),
  );

  let outcome = pipeline.process(&pdf).await;
  search.assert_async().await;
  assert!(matches!(failure_reason(&outcome), Some(FailureReason::DoiNotResolved(_))));
  assert!(logs_contain("Rate limit triggered"));
  Ok(())
}
