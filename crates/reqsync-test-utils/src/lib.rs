//! Testing utilities for the reqsync workspace
//!
//! Shared fixtures, scripted remote services, and helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reqsync_document::{Priority, PrioritySetting, RequirementsRecord, SourceRef};
use reqsync_resilience::{AuthProvider, Credentials, IssuedToken, RemoteError};
use reqsync_sync::{RemoteTaskId, TaskApi, TaskDraft, UserStory};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

/// Well-formed document exercising every section
pub const SAMPLE_DOCUMENT: &str = "\
# Customer Portal

## 📋 Executive Summary
A self-service portal for customers.

## 🎯 Business Objectives
- Reduce support calls by 30%

## Functional Requirements
1. Customers can log in
2. Customers can download invoices
3. Customers can update their address

## Acceptance Criteria
- [ ] Login completes in under 2 seconds
- [ ] Invoices download as PDF

## Non-Functional Requirements
- 99.9% uptime

## 👥 Stakeholders
@alice
@bob-smith

## Priority
High
";

/// Document with a blank summary and a malformed stakeholder
pub const INVALID_DOCUMENT: &str = "\
# Draft

## Summary

## Functional Requirements
- Something

## Stakeholders
@-nobody
";

pub fn complete_record() -> RequirementsRecord {
    RequirementsRecord::new(SourceRef::new("fixture.md"))
        .with_title("Customer Portal")
        .with_summary("A self-service portal for customers.")
        .with_objectives(["Reduce support calls by 30%"])
        .with_functional_requirements(["Customers can log in", "Customers can download invoices"])
        .with_acceptance_criteria(["Login completes in under 2 seconds"])
        .with_stakeholders(["alice", "bob-smith"])
        .with_priority(PrioritySetting::Recognized(Priority::High))
}

pub fn stories(count: usize) -> Vec<UserStory> {
    (1..=count)
        .map(|n| UserStory {
            title: format!("Story {n}"),
            description: format!("Requirement number {n}"),
            acceptance_criteria: vec![format!("Criterion for story {n}")],
            priority: Priority::Medium,
            estimated_hours: 4,
            labels: vec!["requirements".to_string()],
        })
        .collect()
}

/// Task API that replays a script of failures, then succeeds
///
/// Each call pops the next scripted response; an empty script means success.
#[derive(Debug, Default)]
pub struct ScriptedTaskApi {
    script: Mutex<VecDeque<Option<RemoteError>>>,
    calls: Mutex<Vec<(String, String)>>,
    next_id: AtomicU32,
}

impl ScriptedTaskApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure
    pub fn then_fail(self, error: RemoteError) -> Self {
        self.script.lock().push_back(Some(error));
        self
    }

    /// Queue `n` identical failures
    pub fn then_fail_times(self, n: usize, error: &RemoteError) -> Self {
        {
            let mut script = self.script.lock();
            for _ in 0..n {
                script.push_back(Some(error.clone()));
            }
        }
        self
    }

    /// Queue a success
    pub fn then_succeed(self) -> Self {
        self.script.lock().push_back(None);
        self
    }

    /// `(token, title)` for every call, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn titles(&self) -> Vec<String> {
        self.calls().into_iter().map(|(_, title)| title).collect()
    }
}

#[async_trait]
impl TaskApi for ScriptedTaskApi {
    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<RemoteTaskId, RemoteError> {
        self.calls
            .lock()
            .push((token.to_string(), draft.title.clone()));
        let scripted = self.script.lock().pop_front().flatten();
        match scripted {
            Some(error) => Err(error),
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(RemoteTaskId::new(format!("T-{n}")))
            }
        }
    }
}

/// Auth provider issuing `token-1`, `token-2`, ...
#[derive(Debug)]
pub struct CountingAuthProvider {
    issued: AtomicU32,
    lifetime_secs: i64,
}

impl CountingAuthProvider {
    pub fn new(lifetime_secs: i64) -> Self {
        Self {
            issued: AtomicU32::new(0),
            lifetime_secs,
        }
    }

    pub fn issued(&self) -> u32 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for CountingAuthProvider {
    fn default() -> Self {
        Self::new(3600)
    }
}

#[async_trait]
impl AuthProvider for CountingAuthProvider {
    async fn issue_token(&self, _credentials: &Credentials) -> Result<IssuedToken, RemoteError> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IssuedToken::new(format!("token-{n}"), self.lifetime_secs))
    }
}

pub fn test_credentials() -> Credentials {
    Credentials::new("test-client", "test-secret")
}
