//! Integration tests for the devconsole library.
//! These tests require a running backend; set DEVCONSOLE_URL to run them.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;

    use devconsole::{
        AgentType, AssistantBackend, DevAssistant, PendingAttachments, PlainTextRenderer,
        QueryOptions, QueryRequest, Session, StreamEvent, TurnStatus,
    };

    fn client() -> Option<DevAssistant> {
        let url = std::env::var("DEVCONSOLE_URL").ok();
        if url.is_none() {
            eprintln!("Skipping test: DEVCONSOLE_URL not set");
            return None;
        }
        Some(DevAssistant::new(url).expect("Failed to create client"))
    }

    #[tokio::test]
    async fn test_health_and_session_lifecycle() {
        let Some(client) = client() else { return };

        let health = client.health().await.expect("health should succeed");
        assert!(!health.status.is_empty());

        let created = client
            .create_session()
            .await
            .expect("create_session should succeed");
        let info = client
            .session_info(&created.session_id)
            .await
            .expect("session_info should succeed");
        assert_eq!(info.session_id, created.session_id);
        assert_eq!(info.message_count, 0);

        client
            .delete_session(&created.session_id)
            .await
            .expect("delete_session should succeed");
        let err = client
            .session_info(&created.session_id)
            .await
            .expect_err("deleted session should be gone");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_streaming_query() {
        let Some(client) = client() else { return };

        let created = client
            .create_session()
            .await
            .expect("create_session should succeed");
        let request = QueryRequest::new("Say 'test passed'", Some(created.session_id.clone()))
            .with_agent_type(AgentType::CloudArchitect);
        let mut stream = client
            .query_stream(request)
            .await
            .expect("Stream request should succeed");

        let mut saw_terminal = false;
        while let Some(event) = stream.next().await {
            if matches!(
                event,
                Ok(StreamEvent::Complete { .. }) | Ok(StreamEvent::Error { .. })
            ) {
                saw_terminal = true;
            }
        }
        assert!(saw_terminal, "stream should end with complete or error");

        let _ = client.delete_session(&created.session_id).await;
    }

    #[tokio::test]
    async fn test_session_send_blocking() {
        let Some(client) = client() else { return };

        let mut session = Session::new(Arc::new(client));
        session.create().await.expect("create should succeed");
        let options = QueryOptions {
            show_details: false,
            enable_review: false,
            agent_type: AgentType::Developer,
        };
        let mut attachments = PendingAttachments::new();
        let mut renderer = PlainTextRenderer::with_color(false);
        let status = session
            .send_blocking("Count to 3", &mut attachments, &options, &mut renderer)
            .await
            .expect("send should start");
        assert_eq!(status, TurnStatus::Finished);
        assert!(session.messages().len() >= 2);

        let _ = session.delete().await;
    }
}
