// src/runners.rs
use reqwest::{Method, StatusCode};

use crate::client::{Client, Response};
use crate::error::{Error, Result};
use crate::models::{
    AutomationActionsRunner, AutomationActionsRunnerPayload, ListRunnersOptions,
    ListRunnersResponse, Payload, TeamReference,
};

const RUNNERS_PATH: &str = "/automation_actions/runners";

/// Operations on `/automation_actions/runners`.
pub struct AutomationActionsRunnerService<'a> {
    client: &'a Client,
}

impl<'a> AutomationActionsRunnerService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetch a runner by id.
    pub async fn get(&self, id: &str) -> Result<(AutomationActionsRunner, Response)> {
        let path = runner_path(id)?;
        let (payload, res): (AutomationActionsRunnerPayload, _) =
            self.client.fetch::<(), _>(Method::GET, &path, &[], None).await?;
        Ok((payload.into_inner(), res))
    }

    /// Create a runner. `id` and `creation_time` are assigned by the server.
    pub async fn create(&self, runner: &AutomationActionsRunner) -> Result<(AutomationActionsRunner, Response)> {
        if runner.name.trim().is_empty() {
            return Err(Error::InvalidArgument("runner name must not be empty".into()));
        }
        if runner.id.is_some() || runner.creation_time.is_some() {
            return Err(Error::InvalidArgument(
                "runner id and creation_time are assigned by the server".into(),
            ));
        }
        let body = Payload::new(runner);
        let (payload, res): (AutomationActionsRunnerPayload, _) = self
            .client
            .fetch(Method::POST, RUNNERS_PATH, &[], Some(&body))
            .await?;
        Ok((payload.into_inner(), res))
    }

    /// Replace the mutable fields of an existing runner.
    pub async fn update(&self, id: &str, runner: &AutomationActionsRunner) -> Result<(AutomationActionsRunner, Response)> {
        let path = runner_path(id)?;
        let body = Payload::new(runner);
        let (payload, res): (AutomationActionsRunnerPayload, _) =
            self.client.fetch(Method::PUT, &path, &[], Some(&body)).await?;
        Ok((payload.into_inner(), res))
    }

    /// Delete a runner. Only `204 No Content` counts as success.
    pub async fn delete(&self, id: &str) -> Result<Response> {
        let path = runner_path(id)?;
        let res = self.client.send::<()>(Method::DELETE, &path, &[], None).await?;
        expect_no_content(res)
    }

    /// List a single page of runners.
    pub async fn list(&self, opts: &ListRunnersOptions) -> Result<(ListRunnersResponse, Response)> {
        let query = opts.query_pairs();
        self.client
            .fetch::<(), _>(Method::GET, RUNNERS_PATH, &query, None)
            .await
    }

    /// Grant a team access to a runner.
    pub async fn associate_team(&self, runner_id: &str, team_id: &str) -> Result<(TeamReference, Response)> {
        let path = format!("{}/teams", runner_path(runner_id)?);
        check_id("team", team_id)?;
        let body = Payload::new(TeamReference::new(team_id));
        let (payload, res): (Payload<TeamReference>, _) =
            self.client.fetch(Method::POST, &path, &[], Some(&body)).await?;
        Ok((payload.into_inner(), res))
    }

    /// Revoke a team's access to a runner.
    pub async fn dissociate_team(&self, runner_id: &str, team_id: &str) -> Result<Response> {
        let path = team_path(runner_id, team_id)?;
        let res = self.client.send::<()>(Method::DELETE, &path, &[], None).await?;
        expect_no_content(res)
    }

    pub async fn get_team_association(&self, runner_id: &str, team_id: &str) -> Result<(TeamReference, Response)> {
        let path = team_path(runner_id, team_id)?;
        let (payload, res): (Payload<TeamReference>, _) =
            self.client.fetch::<(), _>(Method::GET, &path, &[], None).await?;
        Ok((payload.into_inner(), res))
    }
}

fn runner_path(id: &str) -> Result<String> {
    check_id("runner", id)?;
    Ok(format!("{RUNNERS_PATH}/{id}"))
}

fn team_path(runner_id: &str, team_id: &str) -> Result<String> {
    check_id("team", team_id)?;
    Ok(format!("{}/teams/{team_id}", runner_path(runner_id)?))
}

// PagerDuty ids are ULIDs or short alphanumeric codes; anything else would need path escaping.
fn check_id(what: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} id must not be empty")));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(Error::InvalidArgument(format!("{what} id `{id}` contains unsupported characters")));
    }
    Ok(())
}

fn expect_no_content(res: Response) -> Result<Response> {
    if res.status != StatusCode::NO_CONTENT {
        return Err(Error::from_status(res.status, &res.body));
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::MockTransport;
    use crate::models::{AutomationActionsPrivileges, RunnerType};
    use std::sync::Arc;

    const RUNNER_ID: &str = "01DA2MLYN0J5EFC1LKWXUKDDKT";
    const RUNNER_PATH: &str = "/automation_actions/runners/01DA2MLYN0J5EFC1LKWXUKDDKT";
    const DESCRIPTION: &str = "us-west-2 prod sidecar runner provisioned by SRE";

    fn setup() -> (Arc<MockTransport>, Client) {
        let mux = MockTransport::new();
        let client = Client::with_transport(mux.clone());
        (mux, client)
    }

    #[tokio::test]
    async fn test_sidecar_runner_get() {
        let (mux, client) = setup();
        mux.handle(
            Method::GET,
            RUNNER_PATH,
            StatusCode::OK,
            r#"{ "runner": { "id": "01DA2MLYN0J5EFC1LKWXUKDDKT", "name": "us-west-2 prod sidecar runner", "summary": "us-west-2 prod sidecar runner", "type": "runner", "description": "us-west-2 prod sidecar runner provisioned by SRE", "creation_time": "2022-10-21T19:42:52.127369Z", "runner_type": "sidecar", "status": "Configured", "teams": [ { "id": "PQ9K7I8", "type": "team_reference" } ], "privileges": { "permissions": [ "read" ] } } }"#,
        );

        let (runner, res) = client.automation_actions_runner().get(RUNNER_ID).await.unwrap();
        assert_eq!(res.status, StatusCode::OK);

        let want = AutomationActionsRunner {
            id: Some(RUNNER_ID.to_string()),
            name: "us-west-2 prod sidecar runner".to_string(),
            summary: Some("us-west-2 prod sidecar runner".to_string()),
            description: Some(DESCRIPTION.to_string()),
            creation_time: Some("2022-10-21T19:42:52.127369Z".to_string()),
            last_seen: None,
            runner_type: RunnerType::Sidecar,
            kind: "runner".to_string(),
            status: Some("Configured".to_string()),
            runbook_base_uri: None,
            runbook_api_key: None,
            teams: Some(vec![TeamReference::new("PQ9K7I8")]),
            privileges: Some(AutomationActionsPrivileges {
                permissions: vec!["read".to_string()],
            }),
        };
        assert_eq!(runner, want);
        assert_eq!(mux.requests()[0].method, Method::GET);
    }

    #[tokio::test]
    async fn test_runbook_runner_get() {
        let (mux, client) = setup();
        mux.handle(
            Method::GET,
            RUNNER_PATH,
            StatusCode::OK,
            r#"{ "runner": { "id": "01DA2MLYN0J5EFC1LKWXUKDDKT", "name": "us-west-2 prod sidecar runner", "summary": "us-west-2 prod sidecar runner", "type": "runner", "description": "us-west-2 prod sidecar runner provisioned by SRE", "creation_time": "2022-10-21T19:42:52.127369Z", "last_seen": "2022-10-21T19:42:53.123456Z", "runner_type": "runbook", "status": "Configured", "runbook_base_uri": "acme.prod" } }"#,
        );

        let (runner, _) = client.automation_actions_runner().get(RUNNER_ID).await.unwrap();

        let want = AutomationActionsRunner {
            id: Some(RUNNER_ID.to_string()),
            name: "us-west-2 prod sidecar runner".to_string(),
            summary: Some("us-west-2 prod sidecar runner".to_string()),
            description: Some(DESCRIPTION.to_string()),
            creation_time: Some("2022-10-21T19:42:52.127369Z".to_string()),
            last_seen: Some("2022-10-21T19:42:53.123456Z".to_string()),
            runner_type: RunnerType::Runbook,
            kind: "runner".to_string(),
            status: Some("Configured".to_string()),
            runbook_base_uri: Some("acme.prod".to_string()),
            runbook_api_key: None,
            teams: None,
            privileges: None,
        };
        assert_eq!(runner, want);
    }

    #[tokio::test]
    async fn test_runner_create() {
        let (mux, client) = setup();
        let input = AutomationActionsRunner::new("us-west-2 prod sidecar runner", RunnerType::Sidecar)
            .with_description(DESCRIPTION);
        mux.handle(
            Method::POST,
            "/automation_actions/runners",
            StatusCode::OK,
            r#"{ "runner": { "id": "01DA2MLYN0J5EFC1LKWXUKDDKT", "name": "us-west-2 prod sidecar runner", "type": "runner", "description": "us-west-2 prod sidecar runner provisioned by SRE", "creation_time": "2022-10-21T19:42:52.127369Z", "runner_type": "sidecar", "status": "Configured" } }"#,
        );

        let (runner, _) = client.automation_actions_runner().create(&input).await.unwrap();

        let requests = mux.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        let sent: AutomationActionsRunnerPayload =
            serde_json::from_slice(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent.resource, input);

        let mut want = AutomationActionsRunner::new("us-west-2 prod sidecar runner", RunnerType::Sidecar)
            .with_description(DESCRIPTION);
        want.id = Some(RUNNER_ID.to_string());
        want.creation_time = Some("2022-10-21T19:42:52.127369Z".to_string());
        want.status = Some("Configured".to_string());
        assert_eq!(runner, want);
        assert_eq!(runner.summary, None);
        assert_eq!(runner.teams, None);
        assert_eq!(runner.privileges, None);
    }

    #[tokio::test]
    async fn test_runner_create_rejects_blank_name() {
        let (mux, client) = setup();
        let input = AutomationActionsRunner::new("  ", RunnerType::Runbook);

        let err = client.automation_actions_runner().create(&input).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(mux.requests().is_empty());
    }

    #[tokio::test]
    async fn test_runner_create_rejects_server_assigned_fields() {
        let (mux, client) = setup();
        let service = client.automation_actions_runner();

        let mut with_id = AutomationActionsRunner::new("r", RunnerType::Sidecar);
        with_id.id = Some(RUNNER_ID.to_string());
        assert!(matches!(service.create(&with_id).await, Err(Error::InvalidArgument(_))));

        let mut with_created = AutomationActionsRunner::new("r", RunnerType::Sidecar);
        with_created.creation_time = Some("2022-10-21T19:42:52.127369Z".to_string());
        assert!(matches!(service.create(&with_created).await, Err(Error::InvalidArgument(_))));

        assert!(mux.requests().is_empty());
    }

    #[tokio::test]
    async fn test_runner_delete() {
        let (mux, client) = setup();
        mux.handle(Method::DELETE, RUNNER_PATH, StatusCode::NO_CONTENT, "");

        let res = client.automation_actions_runner().delete(RUNNER_ID).await.unwrap();
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert_eq!(mux.requests()[0].method, Method::DELETE);
        assert_eq!(mux.requests()[0].body, None);
    }

    #[tokio::test]
    async fn test_runner_delete_requires_no_content() {
        let (mux, client) = setup();
        mux.handle(Method::DELETE, RUNNER_PATH, StatusCode::OK, "{}");

        let err = client.automation_actions_runner().delete(RUNNER_ID).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_runner_get_not_found() {
        let (mux, client) = setup();
        mux.handle(
            Method::GET,
            RUNNER_PATH,
            StatusCode::NOT_FOUND,
            r#"{"error":{"code":2100,"message":"Not Found"}}"#,
        );

        let result = client.automation_actions_runner().get(RUNNER_ID).await;
        match result {
            Err(Error::Api { status, error: Some(body), .. }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body.message.as_deref(), Some("Not Found"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_runner_create_server_error() {
        let (mux, client) = setup();
        mux.handle(Method::POST, "/automation_actions/runners", StatusCode::INTERNAL_SERVER_ERROR, "");
        let input = AutomationActionsRunner::new("r", RunnerType::Sidecar);

        let result = client.automation_actions_runner().create(&input).await;
        assert!(matches!(result, Err(Error::Api { .. })));
    }

    #[tokio::test]
    async fn test_runner_get_rejects_bad_ids() {
        let (mux, client) = setup();
        let service = client.automation_actions_runner();

        assert!(matches!(service.get("").await, Err(Error::InvalidArgument(_))));
        assert!(matches!(service.get("../teams").await, Err(Error::InvalidArgument(_))));
        assert!(matches!(service.delete("a b").await, Err(Error::InvalidArgument(_))));
        assert!(mux.requests().is_empty());
    }

    #[tokio::test]
    async fn test_runner_update() {
        let (mux, client) = setup();
        mux.handle(
            Method::PUT,
            RUNNER_PATH,
            StatusCode::OK,
            r#"{"runner":{"id":"01DA2MLYN0J5EFC1LKWXUKDDKT","name":"renamed","type":"runner","runner_type":"runbook","runbook_base_uri":"acme.staging","creation_time":"2022-10-21T19:42:52.127369Z"}}"#,
        );
        let input = AutomationActionsRunner::new("renamed", RunnerType::Runbook)
            .with_runbook("acme.staging", Some("secret-key".to_string()));

        let (runner, _) = client.automation_actions_runner().update(RUNNER_ID, &input).await.unwrap();
        assert_eq!(runner.name, "renamed");
        assert_eq!(runner.runbook_base_uri.as_deref(), Some("acme.staging"));
        assert_eq!(runner.runbook_api_key, None);

        let sent: serde_json::Value =
            serde_json::from_slice(mux.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["runner"]["runbook_api_key"], "secret-key");
        assert_eq!(mux.requests()[0].method, Method::PUT);
    }

    #[tokio::test]
    async fn test_runner_list() {
        let (mux, client) = setup();
        mux.handle(
            Method::GET,
            "/automation_actions/runners",
            StatusCode::OK,
            r#"{"runners":[{"id":"A1","name":"prod-a","type":"runner","runner_type":"sidecar"},{"id":"B2","name":"prod-b","type":"runner","runner_type":"runbook"}],"next_cursor":"abc","limit":2}"#,
        );
        let opts = ListRunnersOptions { name: Some("prod".into()), limit: Some(2) };

        let (list, _) = client.automation_actions_runner().list(&opts).await.unwrap();
        assert_eq!(list.runners.len(), 2);
        assert_eq!(list.runners[1].runner_type, RunnerType::Runbook);
        assert_eq!(list.next_cursor.as_deref(), Some("abc"));
        assert_eq!(
            mux.requests()[0].query,
            vec![("name".to_string(), "prod".to_string()), ("limit".to_string(), "2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_runner_team_association() {
        let (mux, client) = setup();
        let teams_path = format!("{RUNNER_PATH}/teams");
        let team_path = format!("{RUNNER_PATH}/teams/PQ9K7I8");
        let team_json = r#"{"team":{"type":"team_reference","id":"PQ9K7I8"}}"#;
        mux.handle(Method::POST, &teams_path, StatusCode::OK, team_json);
        mux.handle(Method::GET, &team_path, StatusCode::OK, team_json);
        mux.handle(Method::DELETE, &team_path, StatusCode::NO_CONTENT, "");
        let service = client.automation_actions_runner();

        let (team, _) = service.associate_team(RUNNER_ID, "PQ9K7I8").await.unwrap();
        assert_eq!(team, TeamReference::new("PQ9K7I8"));
        assert_eq!(mux.requests()[0].body.as_deref(), Some(team_json.as_bytes()));

        let (team, _) = service.get_team_association(RUNNER_ID, "PQ9K7I8").await.unwrap();
        assert_eq!(team.id, "PQ9K7I8");

        service.dissociate_team(RUNNER_ID, "PQ9K7I8").await.unwrap();

        let methods: Vec<Method> = mux.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![Method::POST, Method::GET, Method::DELETE]);
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_client() {
        let (mux, client) = setup();
        mux.handle(
            Method::GET,
            RUNNER_PATH,
            StatusCode::OK,
            r#"{"runner":{"id":"01DA2MLYN0J5EFC1LKWXUKDDKT","name":"r","type":"runner","runner_type":"sidecar"}}"#,
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.automation_actions_runner().get(RUNNER_ID).await.map(|(r, _)| r) })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().name, "r");
        }
        assert_eq!(mux.requests().len(), 4);
    }
}
