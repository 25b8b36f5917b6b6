//! The SDK façade: annotate data and publish the batch.

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{Instrument, Span};

use trust_sdk_annotators::{AnnotationContext, Annotator, AnnotatorFactory, SourceAnnotator};
use trust_sdk_core::{Annotation, Context, MonotonicClock, Result, SdkInfo};
use trust_sdk_stream::{new_stream_provider, StreamProvider};

/// What happened to the data being annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Data produced on this node.
    Create,
    /// Data derived from earlier data.
    Mutate,
    /// Data received from another node.
    Transit,
    /// Data about to leave this node.
    Publish,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Mutate => "mutate",
            Action::Transit => "transit",
            Action::Publish => "publish",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annotates data with every configured annotator and publishes each
/// resulting batch through one stream provider.
///
/// ```no_run
/// # async fn demo(info: trust_sdk::SdkInfo) -> trust_sdk::Result<()> {
/// use trust_sdk::{AnnotationContext, Context, Sdk};
///
/// let sdk = Sdk::new(info, tracing::Span::current())?;
/// let ctx = AnnotationContext::new(Context::background());
/// sdk.bootstrap(ctx.ctx()).await?;
/// let published = sdk.create(&ctx, b"reading").await?;
/// sdk.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Sdk {
    source: SourceAnnotator,
    annotators: Vec<Box<dyn Annotator>>,
    provider: Box<dyn StreamProvider>,
    span: Span,
}

impl Sdk {
    /// Build annotators and provider from `info`. Every configuration error
    /// surfaces here.
    pub fn new(info: SdkInfo, span: Span) -> Result<Self> {
        let provider = new_stream_provider(&info.stream, span.clone())?;
        Self::with_provider(info, provider, span)
    }

    /// Like [`Sdk::new`], publishing through `provider` instead of the one
    /// `info.stream` names.
    pub fn with_provider(
        info: SdkInfo,
        provider: Box<dyn StreamProvider>,
        span: Span,
    ) -> Result<Self> {
        let factory = AnnotatorFactory::with_clock(&info, Arc::new(MonotonicClock::new()))?;
        Self::from_factory(&factory, provider, span)
    }

    /// Assemble from a prepared factory, e.g. one with a custom attestor.
    pub fn from_factory(
        factory: &AnnotatorFactory,
        provider: Box<dyn StreamProvider>,
        span: Span,
    ) -> Result<Self> {
        Ok(Self {
            source: factory.source(),
            annotators: factory.build_all()?,
            provider,
            span,
        })
    }

    pub fn annotators(&self) -> impl Iterator<Item = &dyn Annotator> {
        self.annotators.iter().map(|a| a.as_ref())
    }

    pub fn provider(&self) -> &dyn StreamProvider {
        self.provider.as_ref()
    }

    /// Connect the stream provider.
    pub async fn bootstrap(&self, ctx: &Context) -> Result<()> {
        self.provider
            .connect(ctx)
            .instrument(tracing::info_span!(parent: &self.span, "bootstrap"))
            .await
    }

    /// Annotate data produced on this node and publish the batch.
    pub async fn create(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Vec<Annotation>> {
        self.record(Action::Create, ctx, data).await
    }

    /// Annotate data derived from `old`. The batch starts with a source
    /// annotation over `old`, followed by every annotator's verdict on `new`.
    pub async fn mutate(
        &self,
        ctx: &AnnotationContext,
        old: &[u8],
        new: &[u8],
    ) -> Result<Vec<Annotation>> {
        let span = self.action_span(Action::Mutate);
        async {
            let origin = self.source.execute(ctx, old).await?;
            let mut batch = Vec::with_capacity(self.annotators.len() + 1);
            batch.push(origin);
            batch.extend(self.annotate(ctx, new).await?);
            self.send(ctx, batch).await
        }
        .instrument(span)
        .await
    }

    /// Annotate data received from another node and publish the batch.
    pub async fn transit(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Vec<Annotation>> {
        self.record(Action::Transit, ctx, data).await
    }

    /// Annotate data about to leave this node and publish the batch.
    pub async fn publish(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Vec<Annotation>> {
        self.record(Action::Publish, ctx, data).await
    }

    /// Close the stream provider.
    pub async fn close(&self) -> Result<()> {
        self.provider
            .close()
            .instrument(tracing::info_span!(parent: &self.span, "close"))
            .await
    }

    async fn record(
        &self,
        action: Action,
        ctx: &AnnotationContext,
        data: &[u8],
    ) -> Result<Vec<Annotation>> {
        let span = self.action_span(action);
        async {
            let batch = self.annotate(ctx, data).await?;
            self.send(ctx, batch).await
        }
        .instrument(span)
        .await
    }

    /// Run every annotator concurrently; results keep configuration order.
    async fn annotate(&self, ctx: &AnnotationContext, data: &[u8]) -> Result<Vec<Annotation>> {
        try_join_all(self.annotators.iter().map(|a| a.execute(ctx, data))).await
    }

    async fn send(&self, ctx: &AnnotationContext, batch: Vec<Annotation>) -> Result<Vec<Annotation>> {
        if batch.is_empty() {
            tracing::debug!("no annotators configured, nothing to publish");
            return Ok(batch);
        }
        self.provider.publish(ctx.ctx(), batch.clone()).await?;
        tracing::info!(annotations = batch.len(), "batch published");
        Ok(batch)
    }

    fn action_span(&self, action: Action) -> Span {
        tracing::info_span!(parent: &self.span, "annotate", action = %action)
    }
}

impl fmt::Debug for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sdk")
            .field(
                "annotators",
                &self.annotators.iter().map(|a| a.kind()).collect::<Vec<_>>(),
            )
            .field("stream", &self.provider.stream_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trust_sdk_core::{AnnotationKind, Error};
    use trust_sdk_stream::MockStreamProvider;
    use trust_sdk_testkit::TestFixture;

    fn sdk(tags: &[&str]) -> (Sdk, MockStreamProvider, TestFixture) {
        let fixture = TestFixture::new();
        let mock = MockStreamProvider::default();
        let sdk = Sdk::with_provider(
            fixture.sdk_info(tags),
            Box::new(mock.clone()),
            Span::none(),
        )
        .unwrap();
        (sdk, mock, fixture)
    }

    #[test]
    fn test_action_names() {
        let names: Vec<_> = [Action::Create, Action::Mutate, Action::Transit, Action::Publish]
            .iter()
            .map(Action::as_str)
            .collect();
        assert_eq!(names, ["create", "mutate", "transit", "publish"]);
    }

    #[tokio::test]
    async fn test_annotations_follow_configuration_order() {
        let (sdk, mock, fixture) = sdk(&["pki", "src"]);
        let ctx = AnnotationContext::default();
        sdk.bootstrap(ctx.ctx()).await.unwrap();

        let batch = sdk.create(&ctx, &fixture.signable("foo")).await.unwrap();
        let kinds: Vec<_> = batch.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, [AnnotationKind::Pki, AnnotationKind::Source]);
        assert_eq!(mock.published(), vec![batch]);
    }

    #[tokio::test]
    async fn test_one_failing_annotator_fails_the_call() {
        // `tls` needs connection info the context does not carry.
        let (sdk, mock, _) = sdk(&["src", "tls"]);
        let ctx = AnnotationContext::default();
        sdk.bootstrap(ctx.ctx()).await.unwrap();

        let result = sdk.create(&ctx, b"foo").await;
        assert!(matches!(result, Err(Error::NoTlsContext)));
        assert!(mock.published().is_empty());
    }

    #[tokio::test]
    async fn test_no_annotators_publishes_nothing() {
        let (sdk, mock, _) = sdk(&[]);
        let ctx = AnnotationContext::default();
        sdk.bootstrap(ctx.ctx()).await.unwrap();

        assert!(sdk.create(&ctx, b"foo").await.unwrap().is_empty());
        assert!(mock.published().is_empty());
    }

    #[tokio::test]
    async fn test_create_before_bootstrap() {
        let (sdk, _, _) = sdk(&["src"]);
        let result = sdk.create(&AnnotationContext::default(), b"foo").await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[test]
    fn test_debug_lists_kinds() {
        let (sdk, _, _) = sdk(&["src", "tls"]);
        let debug = format!("{sdk:?}");
        assert!(debug.contains("Source"));
        assert!(debug.contains("Mock"));
    }
}
