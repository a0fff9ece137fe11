//! Runs a [`Workflow`] against a [`LabelService`], resolving request intents
//! inline so callers only see presentation intents.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::{
    workflow::{Event, Intent, Workflow, WorkflowOptions},
    LabelService,
};

pub struct WorkflowDriver<S: LabelService> {
    workflow: Workflow,
    service: S,
}

impl<S: LabelService> WorkflowDriver<S> {
    pub fn new(service: S, options: WorkflowOptions) -> Self {
        Self {
            workflow: Workflow::new(options),
            service,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Applies `event`, awaiting every request it triggers. Requests run one at
    /// a time in the order they were issued.
    pub async fn dispatch(&mut self, event: Event) -> Vec<Intent> {
        let mut queue = VecDeque::from([event]);
        let mut rendered = Vec::new();

        while let Some(event) = queue.pop_front() {
            for intent in self.workflow.handle(event) {
                match intent {
                    Intent::IssueParse(file) => {
                        info!(file = %file.name, "parsing report");
                        let result = self.service.parse_report(&file).await;
                        queue.push_back(Event::ParseSettled(result));
                    }
                    Intent::IssueGenerate(request) => {
                        info!(imei = %request.imei, "generating label");
                        let result = self.service.generate_label(&request).await;
                        queue.push_back(Event::GenerateSettled(result));
                    }
                    Intent::IssueLegacyUpload(file) => {
                        info!(file = %file.name, "uploading report");
                        let result = self.service.upload_report(&file).await;
                        queue.push_back(Event::LegacyUploadSettled(result));
                    }
                    other => {
                        debug!(intent = ?other, "workflow intent");
                        rendered.push(other);
                    }
                }
            }
        }

        rendered
    }

    /// Applies several events in order and concatenates their intents.
    pub async fn dispatch_all(&mut self, events: impl IntoIterator<Item = Event>) -> Vec<Intent> {
        let mut rendered = Vec::new();
        for event in events {
            rendered.extend(self.dispatch(event).await);
        }
        rendered
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
