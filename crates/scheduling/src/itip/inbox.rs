/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use trc::AddContext;

use crate::{
    Scheduler,
    backend::{Principal, SchedulingBackend},
    config::NotificationPreference,
    entity::EntityType,
    itip::{
        EntityChange, InboxMessage, ItipError, ItipIngestError, MessageProcessor, ProcessResult,
        SchedulingMethod, cancel::CancelProcessor, counter::CounterProcessor,
        poll_status::PollStatusProcessor, refresh::RefreshProcessor, reply::ReplyProcessor,
        request::RequestProcessor,
    },
};

/// What happened to the inbox message once processing finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboxDisposition {
    Deleted,
    Processed,
    #[default]
    Retained,
}

#[derive(Debug, Default)]
pub struct RouteOutcome {
    pub result: ProcessResult,
    pub disposition: InboxDisposition,
    /// Document id of an entity created for a new invitation.
    pub document_id: Option<u32>,
}

/// Hands delivered scheduling messages to the matching processor and
/// applies its verdict.
pub struct InboxRouter<'x, B: SchedulingBackend> {
    scheduler: &'x Scheduler<B>,
}

impl<'x, B: SchedulingBackend> InboxRouter<'x, B> {
    pub fn new(scheduler: &'x Scheduler<B>) -> Self {
        InboxRouter { scheduler }
    }

    pub fn is_supported(method: SchedulingMethod, entity_type: EntityType) -> bool {
        match method {
            SchedulingMethod::Request | SchedulingMethod::Reply | SchedulingMethod::Cancel => true,
            SchedulingMethod::Refresh | SchedulingMethod::Counter => {
                entity_type != EntityType::Poll
            }
            SchedulingMethod::PollStatus => entity_type == EntityType::Poll,
            SchedulingMethod::DeclineCounter | SchedulingMethod::Add | SchedulingMethod::Publish => {
                false
            }
        }
    }

    pub async fn route(&self, message: &InboxMessage) -> RouteOutcome {
        let principal = match self
            .scheduler
            .directory
            .principal(&self.scheduler.backend, message.account_id)
            .await
        {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                return self.reject(
                    message,
                    trc::DirectoryEvent::PrincipalNotFound
                        .into_err()
                        .account_id(message.account_id)
                        .into(),
                );
            }
            Err(err) => return self.reject(message, err.into()),
        };

        trc::event!(
            Scheduling(trc::SchedulingEvent::MessageReceived),
            AccountId = message.account_id,
            Uid = message.entity.uid.as_str(),
            Method = message.method.as_str(),
            Type = message.entity.entity_type.as_str(),
            Id = message.id,
        );

        if !Self::is_supported(message.method, message.entity.entity_type) {
            return self.reject(
                message,
                ItipError::UnsupportedMethod {
                    method: message.method,
                    entity_type: message.entity.entity_type,
                }
                .into(),
            );
        }

        let _lock = self
            .scheduler
            .lock_entity(principal.account_id, &message.entity.uid)
            .await;
        let result = match message.method {
            SchedulingMethod::Request => {
                RequestProcessor::new(self.scheduler)
                    .process(&principal, message)
                    .await
            }
            SchedulingMethod::Reply => {
                ReplyProcessor::new(self.scheduler)
                    .process(&principal, message)
                    .await
            }
            SchedulingMethod::Cancel => {
                CancelProcessor::new(self.scheduler)
                    .process(&principal, message)
                    .await
            }
            SchedulingMethod::Refresh => {
                RefreshProcessor::new(self.scheduler)
                    .process(&principal, message)
                    .await
            }
            SchedulingMethod::Counter => {
                CounterProcessor::new(self.scheduler)
                    .process(&principal, message)
                    .await
            }
            SchedulingMethod::PollStatus => {
                PollStatusProcessor::new(self.scheduler)
                    .process(&principal, message)
                    .await
            }
            SchedulingMethod::DeclineCounter | SchedulingMethod::Add | SchedulingMethod::Publish => {
                ProcessResult::error(ItipError::UnsupportedMethod {
                    method: message.method,
                    entity_type: message.entity.entity_type,
                })
            }
        };

        match self.apply(&principal, message, result).await {
            Ok(outcome) => outcome,
            Err((result, err)) => {
                trc::error!(
                    err.clone()
                        .account_id(message.account_id)
                        .uid(message.entity.uid.as_str())
                        .id(message.id)
                );
                RouteOutcome {
                    result: ProcessResult {
                        error: Some(ItipIngestError::Internal(err)),
                        ..result
                    },
                    ..Default::default()
                }
            }
        }
    }

    async fn apply(
        &self,
        principal: &Principal,
        message: &InboxMessage,
        mut result: ProcessResult,
    ) -> Result<RouteOutcome, (ProcessResult, trc::Error)> {
        if let Some(err) = result.error.take() {
            return Ok(self.reject(message, err));
        }

        let document_id = match self.commit(principal, &result.change).await {
            Ok(document_id) => document_id,
            Err(err) => return Err((result, err)),
        };

        let mut delivered = true;
        for outbound in &result.messages {
            match self.scheduler.backend.send(outbound).await {
                Ok(()) => {
                    if outbound.method == SchedulingMethod::Reply {
                        trc::event!(
                            Scheduling(trc::SchedulingEvent::ReplySent),
                            AccountId = principal.account_id,
                            Uid = outbound.entity.uid.as_str(),
                            To = outbound
                                .to
                                .iter()
                                .map(|to| to.as_str().to_string())
                                .collect::<Vec<_>>(),
                        );
                    }
                }
                Err(err) => {
                    trc::error!(err.account_id(principal.account_id).caused_by(trc::location!()));
                    delivered = false;
                }
            }
        }

        let disposition = if result.no_inbox_change || !delivered {
            InboxDisposition::Retained
        } else if result.remove_inbox_entry {
            InboxDisposition::Deleted
        } else {
            match self.scheduler.preferences(principal).notify {
                NotificationPreference::Never => InboxDisposition::Deleted,
                NotificationPreference::UnlessAccepted if result.attendee_accepting => {
                    InboxDisposition::Deleted
                }
                _ => InboxDisposition::Processed,
            }
        };

        let disposed = match disposition {
            InboxDisposition::Deleted => self
                .scheduler
                .backend
                .delete_inbox_entry(principal, message.id)
                .await
                .map(|_| trc::SchedulingEvent::InboxEntryDeleted),
            InboxDisposition::Processed => self
                .scheduler
                .backend
                .mark_inbox_processed(principal, message.id)
                .await
                .map(|_| trc::SchedulingEvent::InboxEntryProcessed),
            InboxDisposition::Retained => {
                return Ok(RouteOutcome {
                    result,
                    disposition,
                    document_id,
                });
            }
        };
        match disposed.caused_by(trc::location!()) {
            Ok(event) => {
                trc::event!(
                    Scheduling(event),
                    AccountId = principal.account_id,
                    Id = message.id,
                );
                Ok(RouteOutcome {
                    result,
                    disposition,
                    document_id,
                })
            }
            Err(err) => Err((result, err)),
        }
    }

    async fn commit(&self, principal: &Principal, change: &EntityChange) -> trc::Result<Option<u32>> {
        let backend = &self.scheduler.backend;
        match change {
            EntityChange::None => Ok(None),
            EntityChange::Create {
                collection_id,
                entity,
            } => backend
                .create_entity(principal, *collection_id, entity)
                .await
                .map(Some)
                .caused_by(trc::location!()),
            EntityChange::Update {
                entity,
                suppress_notifications,
                on_behalf_of,
            } => backend
                .update_entity(
                    principal,
                    entity,
                    *suppress_notifications,
                    on_behalf_of.as_ref(),
                )
                .await
                .map(|_| entity.document_id)
                .caused_by(trc::location!()),
            EntityChange::Delete { entity, force } => backend
                .delete_entity(principal, entity, *force)
                .await
                .map(|_| None)
                .caused_by(trc::location!()),
        }
    }

    /// Rejected messages stay in the inbox untouched.
    fn reject(&self, message: &InboxMessage, error: ItipIngestError) -> RouteOutcome {
        match &error {
            ItipIngestError::Message(err) => trc::event!(
                Scheduling(trc::SchedulingEvent::MessageRejected),
                AccountId = message.account_id,
                Uid = message.entity.uid.as_str(),
                Method = message.method.as_str(),
                Code = err.code(),
                Reason = err.to_string(),
            ),
            ItipIngestError::Internal(err) => trc::error!(
                err.clone()
                    .account_id(message.account_id)
                    .uid(message.entity.uid.as_str())
            ),
        }

        RouteOutcome {
            result: ProcessResult::error(error),
            ..Default::default()
        }
    }
}
