use {
    async_trait::async_trait,
    herald_channels::{FileKind, MediaItem, OutgoingFile, Request, Response, SendOptions, WireMethod},
    tracing::debug,
};

use {
    super::{DeliveryContext, DeliveryExecutor, report_context},
    crate::dispatcher::DeliveryIntent,
};

/// Sends several files as one album.
///
/// Degrade chain on failure: the first file alone as a photo captioned with
/// the names of the others, then a plain text message naming the first file.
pub struct SendMediaGroupExecutor;

#[async_trait]
impl DeliveryExecutor for SendMediaGroupExecutor {
    async fn deliver(&self, ctx: &DeliveryContext, intent: DeliveryIntent, request: Option<&Request>) {
        let describe = intent.response.describe();
        let response = match intent.response {
            Response::File(response) => response,
            other => return ctx.report_mismatch(intent.kind, &other),
        };
        let context = report_context(request, &describe);
        let Some((first, rest)) = response.files.split_first() else {
            ctx.stats.increment_errors(&context, None, "file response without files");
            return;
        };

        let lang = ctx.language(response.chat_id).await;
        let localize = |text: &str| ctx.localizer.substitute(text, &lang);
        let caption = response.text.as_deref().map(localize);
        let names = response
            .files
            .iter()
            .map(|file| file.name.as_deref().map(localize))
            .collect::<Vec<_>>();
        let options = SendOptions::from_settings(ctx.settings(response.settings), response.reply_to);

        let group = WireMethod::SendMediaGroup {
            chat_id: response.chat_id,
            items: album(&response.files, caption, names),
            options,
        };
        let err = match ctx.execute(intent.kind, group).await {
            Ok(()) => return,
            Err(e) => e,
        };

        ctx.enter_fallback(intent.kind, "single_photo", &err);
        let others = rest
            .iter()
            .map(|file| localize(&file.label()))
            .collect::<Vec<_>>();
        let single = WireMethod::SendFile {
            chat_id: response.chat_id,
            media: MediaItem {
                kind: FileKind::Photo,
                source: first.source.clone(),
                caption: (!others.is_empty()).then(|| others.join("\n")),
                spoiler: first.settings.spoiler,
            },
            options: options.plain(),
        };
        let err = match ctx.execute(intent.kind, single).await {
            Ok(()) => return,
            Err(e) => e,
        };

        ctx.enter_fallback(intent.kind, "text", &err);
        let text = WireMethod::SendMessage {
            chat_id: response.chat_id,
            text: localize(&first.label()),
            options: options.plain(),
        };
        match ctx.execute(intent.kind, text).await {
            Ok(()) => debug!(chat = %response.chat_id, "media group degraded to text"),
            Err(e) => ctx.report(&context, e, "failed to send media group and all fallbacks"),
        }
    }
}

/// Album items. The first carries the response caption, or its own name when
/// there is none; the others are captioned with their names. `names` holds
/// the already localized name of each file.
fn album(files: &[OutgoingFile], caption: Option<String>, names: Vec<Option<String>>) -> Vec<MediaItem> {
    let mut caption = caption;
    files
        .iter()
        .zip(names)
        .enumerate()
        .map(|(idx, (file, name))| MediaItem {
            kind: file.kind,
            source: file.source.clone(),
            caption: if idx == 0 { caption.take().or(name) } else { name },
            spoiler: file.settings.spoiler,
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{RecordingTransport, delivery_service},
        herald_channels::{FileResponse, FileSource, TransportError},
        herald_common::ChatId,
        std::sync::Arc,
    };

    fn album_response() -> Response {
        FileResponse::new(ChatId(1), vec![
            OutgoingFile::new(FileKind::Photo, FileSource::RemoteId("p1".into())).named("first.jpg"),
            OutgoingFile::new(FileKind::Photo, FileSource::RemoteId("p2".into())).named("second.jpg"),
            OutgoingFile::new(FileKind::Video, FileSource::RemoteId("v3".into())).named("third.mp4"),
        ])
        .caption("holiday")
        .into()
    }

    #[test]
    fn album_captions() {
        let files = vec![
            OutgoingFile::new(FileKind::Photo, FileSource::RemoteId("a".into())).named("a.jpg"),
            OutgoingFile::new(FileKind::Photo, FileSource::RemoteId("b".into())),
        ];
        let names = || vec![Some("a.jpg".to_string()), None];
        let items = album(&files, Some("trip".into()), names());
        assert_eq!(items[0].caption.as_deref(), Some("trip"));
        assert_eq!(items[1].caption, None);

        let items = album(&files, None, names());
        assert_eq!(items[0].caption.as_deref(), Some("a.jpg"));
    }

    #[tokio::test]
    async fn group_is_sent_in_one_call() {
        let transport = Arc::new(RecordingTransport::default());
        let (stats, service) = delivery_service(Arc::clone(&transport));
        service.deliver(album_response(), None).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let WireMethod::SendMediaGroup { items, .. } = &calls[0] else {
            panic!("unexpected call {:?}", calls[0]);
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].caption.as_deref(), Some("holiday"));
        assert_eq!(items[2].caption.as_deref(), Some("third.mp4"));
        assert_eq!(stats.errors(), 0);
    }

    #[tokio::test]
    async fn first_failure_sends_first_file_as_photo() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("sendMediaGroup", TransportError::Api("group too large".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service.deliver(album_response(), None).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        let WireMethod::SendFile { media, .. } = &calls[1] else {
            panic!("unexpected call {:?}", calls[1]);
        };
        assert_eq!(media.kind, FileKind::Photo);
        assert_eq!(media.source, FileSource::RemoteId("p1".into()));
        assert_eq!(media.caption.as_deref(), Some("second.jpg\nthird.mp4"));
        assert_eq!(stats.errors(), 0);
    }

    #[tokio::test]
    async fn second_failure_names_first_file_in_text() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("sendMediaGroup", TransportError::Api("group too large".into()));
        transport.fail_next("sendPhoto", TransportError::Api("wrong file identifier".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service.deliver(album_response(), None).await.unwrap();

        let calls = transport.calls();
        let names: Vec<_> = calls.iter().map(WireMethod::name).collect();
        assert_eq!(names, vec!["sendMediaGroup", "sendPhoto", "sendMessage"]);
        let WireMethod::SendMessage { text, .. } = &calls[2] else {
            panic!("unexpected call {:?}", calls[2]);
        };
        assert_eq!(text, "first.jpg");
        assert_eq!(stats.errors(), 0);
    }

    #[tokio::test]
    async fn fallback_texts_are_localized() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("sendMediaGroup", TransportError::Api("group too large".into()));
        transport.fail_next("sendPhoto", TransportError::Api("wrong file identifier".into()));
        let (_, service) = delivery_service(Arc::clone(&transport));
        let response: Response = FileResponse::new(ChatId(1), vec![
            OutgoingFile::new(FileKind::Photo, FileSource::RemoteId("p1".into())).named("{{greeting}} 1"),
            OutgoingFile::new(FileKind::Photo, FileSource::RemoteId("p2".into())).named("{{greeting}} 2"),
        ])
        .into();

        service.deliver(response, None).await.unwrap();

        let calls = transport.calls();
        let WireMethod::SendMediaGroup { items, .. } = &calls[0] else {
            panic!("unexpected call {:?}", calls[0]);
        };
        assert_eq!(items[0].caption.as_deref(), Some("Hello 1"));
        assert_eq!(items[1].caption.as_deref(), Some("Hello 2"));
        let WireMethod::SendFile { media, .. } = &calls[1] else {
            panic!("unexpected call {:?}", calls[1]);
        };
        assert_eq!(media.caption.as_deref(), Some("Hello 2"));
        let WireMethod::SendMessage { text, .. } = &calls[2] else {
            panic!("unexpected call {:?}", calls[2]);
        };
        assert_eq!(text, "Hello 1");
    }

    #[tokio::test]
    async fn exhausted_chain_is_reported_once() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("sendMediaGroup", TransportError::Network("reset".into()));
        transport.fail_next("sendPhoto", TransportError::Network("reset".into()));
        transport.fail_next("sendMessage", TransportError::Network("reset".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service.deliver(album_response(), None).await.unwrap();

        assert_eq!(transport.calls().len(), 3);
        assert_eq!(stats.errors(), 1);
    }
}
