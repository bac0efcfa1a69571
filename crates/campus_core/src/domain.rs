//! crates/campus_core/src/domain.rs
//!
//! Defines the core data structures for the platform: users, the three owned
//! entity types with their embedded lists, and direct messages.
//!
//! Owned entities are stored as whole documents. Relations between them are
//! plain identifiers resolved at read time, so a dangling id is never an error.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    Student,
    Recruiter,
    Admin,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Recruiter => "recruiter",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
        }
    }
}

/// Per-user activity counters. Incremented atomically by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub applications_made: u32,
    pub collaborations_joined: u32,
    pub events_attended: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStat {
    ApplicationsMade,
    CollaborationsJoined,
    EventsAttended,
}

impl UserStat {
    /// The camelCase key this counter has inside `UserStats`.
    pub fn key(&self) -> &'static str {
        match self {
            UserStat::ApplicationsMade => "applicationsMade",
            UserStat::CollaborationsJoined => "collaborationsJoined",
            UserStat::EventsAttended => "eventsAttended",
        }
    }
}

/// Represents a platform account. The password hash never lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub college: Option<String>,
    pub year: Option<u8>,
    pub branch: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub resume_url: Option<String>,
    #[serde(default)]
    pub resume_skills: Vec<String>,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(default)]
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(name: &str, email: &str, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            role,
            college: None,
            year: None,
            branch: None,
            bio: None,
            avatar_url: None,
            skills: Vec::new(),
            resume_url: None,
            resume_skills: Vec::new(),
            is_active: true,
            is_verified: false,
            stats: UserStats::default(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Declared skills merged with the ones extracted from the resume.
    pub fn all_skills(&self) -> Vec<String> {
        let mut merged = self.skills.clone();
        merged.extend(self.resume_skills.iter().cloned());
        normalize_skills(merged)
    }

    pub fn apply_patch(&mut self, patch: &ProfilePatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if patch.college.is_some() {
            self.college = patch.college.clone();
        }
        if patch.year.is_some() {
            self.year = patch.year;
        }
        if patch.branch.is_some() {
            self.branch = patch.branch.clone();
        }
        if patch.bio.is_some() {
            self.bio = patch.bio.clone();
        }
        if let Some(skills) = &patch.skills {
            self.skills = normalize_skills(skills.clone());
        }
    }

    pub fn increment_stat(&mut self, stat: UserStat) {
        let counter = match stat {
            UserStat::ApplicationsMade => &mut self.stats.applications_made,
            UserStat::CollaborationsJoined => &mut self.stats.collaborations_joined,
            UserStat::EventsAttended => &mut self.stats.events_attended,
        };
        *counter += 1;
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            college: self.college.clone(),
        }
    }
}

/// The public projection of a user embedded in populated responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub college: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
}

// Represents a browser or API login session (opaque token)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Editable profile fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub college: Option<String>,
    pub year: Option<u8>,
    pub branch: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
}

//=========================================================================================
// Owner references
//=========================================================================================

/// An owner field as it appears on an entity: either the raw id or a
/// populated user object. Both forms normalize to the same identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(Uuid),
    Populated(UserSummary),
}

impl OwnerRef {
    pub fn id(&self) -> Uuid {
        match self {
            OwnerRef::Id(id) => *id,
            OwnerRef::Populated(user) => user.id,
        }
    }
}

impl From<Uuid> for OwnerRef {
    fn from(id: Uuid) -> Self {
        OwnerRef::Id(id)
    }
}

impl From<UserSummary> for OwnerRef {
    fn from(user: UserSummary) -> Self {
        OwnerRef::Populated(user)
    }
}

//=========================================================================================
// Documents
//=========================================================================================

/// Common surface of the three owned, versioned entity types.
///
/// `version` increases by one on every successful write; stores reject a
/// replace whose expected version does not match the stored one.
pub trait Document: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Name of the logical collection, used as a discriminator by stores.
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);
    fn owner(&self) -> Uuid;
    fn status_key(&self) -> &'static str;
    /// Whether the document is visible in public listings and trending.
    fn is_listed(&self) -> bool;
    fn search_text(&self) -> String;
    /// Users that take part in the document (applicants, members, attendees).
    fn participants(&self) -> Vec<Uuid>;
    /// Interactions other than views and saves, used for trending.
    fn engagement(&self) -> usize;
    fn views(&self) -> u64;
    fn views_mut(&mut self) -> &mut u64;
    fn saves(&self) -> &BTreeSet<Uuid>;
    fn saves_mut(&mut self) -> &mut BTreeSet<Uuid>;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn touch(&mut self, now: DateTime<Utc>);
}

//=========================================================================================
// Opportunities
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OpportunityKind {
    #[default]
    Internship,
    Job,
    Research,
    Freelance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OpportunityStatus {
    #[default]
    Active,
    Inactive,
    Closed,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Active => "active",
            OpportunityStatus::Inactive => "inactive",
            OpportunityStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    Rejected,
    Selected,
    Accepted,
    Declined,
}

impl ApplicationStatus {
    /// A live application blocks re-application by the same user.
    pub fn is_live(&self) -> bool {
        !matches!(self, ApplicationStatus::Rejected | ApplicationStatus::Declined)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Selected => "selected",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Declined => "declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub user: Uuid,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub title: String,
    pub company: String,
    pub description: String,
    pub kind: OpportunityKind,
    pub location: Option<String>,
    pub is_remote: bool,
    pub stipend: Option<String>,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub deadline: DateTime<Utc>,
    pub posted_by: Uuid,
    pub status: OpportunityStatus,
    #[serde(default)]
    pub applicants: Vec<Applicant>,
    #[serde(default)]
    pub saves: BTreeSet<Uuid>,
    #[serde(default)]
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDraft {
    pub title: String,
    pub company: String,
    pub description: String,
    #[serde(default)]
    pub kind: OpportunityKind,
    pub location: Option<String>,
    #[serde(default)]
    pub is_remote: bool,
    pub stipend: Option<String>,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub kind: Option<OpportunityKind>,
    pub location: Option<String>,
    pub is_remote: Option<bool>,
    pub stipend: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<OpportunityStatus>,
}

impl Opportunity {
    pub fn new(draft: OpportunityDraft, posted_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            title: draft.title.trim().to_string(),
            company: draft.company.trim().to_string(),
            description: draft.description,
            kind: draft.kind,
            location: draft.location,
            is_remote: draft.is_remote,
            stipend: draft.stipend,
            skills_required: normalize_skills(draft.skills_required),
            deadline: draft.deadline,
            posted_by,
            status: OpportunityStatus::Active,
            applicants: Vec::new(),
            saves: BTreeSet::new(),
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_patch(&mut self, patch: OpportunityPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(company) = patch.company {
            self.company = company.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if patch.location.is_some() {
            self.location = patch.location;
        }
        if let Some(is_remote) = patch.is_remote {
            self.is_remote = is_remote;
        }
        if patch.stipend.is_some() {
            self.stipend = patch.stipend;
        }
        if let Some(skills) = patch.skills_required {
            self.skills_required = normalize_skills(skills);
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    pub fn applicant(&self, user: Uuid) -> Option<&Applicant> {
        self.applicants
            .iter()
            .find(|a| a.user == user && a.status.is_live())
    }
}

impl Document for Opportunity {
    const COLLECTION: &'static str = "opportunities";

    fn id(&self) -> Uuid {
        self.id
    }
    fn version(&self) -> i64 {
        self.version
    }
    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
    fn owner(&self) -> Uuid {
        self.posted_by
    }
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
    fn is_listed(&self) -> bool {
        self.status == OpportunityStatus::Active
    }
    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.title, self.company, self.description, self.skills_required.join(" "))
    }
    fn participants(&self) -> Vec<Uuid> {
        self.applicants.iter().map(|a| a.user).collect()
    }
    fn engagement(&self) -> usize {
        self.applicants.len()
    }
    fn views(&self) -> u64 {
        self.views
    }
    fn views_mut(&mut self) -> &mut u64 {
        &mut self.views
    }
    fn saves(&self) -> &BTreeSet<Uuid> {
        &self.saves
    }
    fn saves_mut(&mut self) -> &mut BTreeSet<Uuid> {
        &mut self.saves
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

//=========================================================================================
// Collaborations
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CollaborationStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Closed,
}

impl CollaborationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaborationStatus::Open => "open",
            CollaborationStatus::InProgress => "in-progress",
            CollaborationStatus::Completed => "completed",
            CollaborationStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum InterestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSize {
    pub current: u32,
    pub required: u32,
}

impl TeamSize {
    pub fn is_full(&self) -> bool {
        self.current >= self.required
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterestedUser {
    pub user: Uuid,
    pub message: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub status: InterestStatus,
}

pub const CREATOR_ROLE: &str = "creator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Collaboration {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    #[serde(default)]
    pub skills_needed: Vec<String>,
    pub created_by: Uuid,
    pub team_size: TeamSize,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
    #[serde(default)]
    pub interested_users: Vec<InterestedUser>,
    pub status: CollaborationStatus,
    #[serde(default)]
    pub saves: BTreeSet<Uuid>,
    #[serde(default)]
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationDraft {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    #[serde(default)]
    pub skills_needed: Vec<String>,
    /// Total team size including the creator.
    pub team_size_required: u32,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub skills_needed: Option<Vec<String>>,
    pub team_size_required: Option<u32>,
    pub status: Option<CollaborationStatus>,
}

impl Collaboration {
    pub fn new(draft: CollaborationDraft, created_by: Uuid, now: DateTime<Utc>) -> Self {
        let creator = TeamMember {
            user: created_by,
            role: CREATOR_ROLE.to_string(),
            joined_at: now,
            status: MemberStatus::Active,
        };
        Self {
            id: Uuid::new_v4(),
            version: 0,
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            skills_needed: normalize_skills(draft.skills_needed),
            created_by,
            team_size: TeamSize {
                current: 1,
                required: draft.team_size_required,
            },
            team_members: vec![creator],
            interested_users: Vec::new(),
            status: CollaborationStatus::Open,
            saves: BTreeSet::new(),
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_member(&self, user: Uuid) -> bool {
        self.team_members.iter().any(|m| m.user == user)
    }

    /// Keeps `team_size.current` in step with the member list.
    pub fn sync_team_size(&mut self) {
        self.team_size.current = self.team_members.len() as u32;
    }
}

impl Document for Collaboration {
    const COLLECTION: &'static str = "collaborations";

    fn id(&self) -> Uuid {
        self.id
    }
    fn version(&self) -> i64 {
        self.version
    }
    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
    fn owner(&self) -> Uuid {
        self.created_by
    }
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
    fn is_listed(&self) -> bool {
        matches!(
            self.status,
            CollaborationStatus::Open | CollaborationStatus::InProgress
        )
    }
    fn search_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.skills_needed.join(" "))
    }
    fn participants(&self) -> Vec<Uuid> {
        self.team_members
            .iter()
            .map(|m| m.user)
            .chain(self.interested_users.iter().map(|i| i.user))
            .collect()
    }
    fn engagement(&self) -> usize {
        self.team_members.len() + self.interested_users.len()
    }
    fn views(&self) -> u64 {
        self.views
    }
    fn views_mut(&mut self) -> &mut u64 {
        &mut self.views
    }
    fn saves(&self) -> &BTreeSet<Uuid> {
        &self.saves
    }
    fn saves_mut(&mut self) -> &mut BTreeSet<Uuid> {
        &mut self.saves
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

//=========================================================================================
// Events
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AttendeeStatus {
    Registered,
    Attended,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    NotRequired,
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub user: Uuid,
    pub registered_at: DateTime<Utc>,
    pub status: AttendeeStatus,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub venue: Option<String>,
    pub is_online: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub fee: Option<u32>,
    pub organizer: Uuid,
    pub status: EventStatus,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub interested: BTreeSet<Uuid>,
    #[serde(default)]
    pub saves: BTreeSet<Uuid>,
    #[serde(default)]
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub venue: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub fee: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub venue: Option<String>,
    pub is_online: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub fee: Option<u32>,
    pub status: Option<EventStatus>,
}

impl Event {
    pub fn new(draft: EventDraft, organizer: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            venue: draft.venue,
            is_online: draft.is_online,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            registration_deadline: draft.registration_deadline,
            capacity: draft.capacity,
            fee: draft.fee,
            organizer,
            status: EventStatus::Upcoming,
            attendees: Vec::new(),
            interested: BTreeSet::new(),
            saves: BTreeSet::new(),
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attendee(&self, user: Uuid) -> Option<&Attendee> {
        self.attendees.iter().find(|a| a.user == user)
    }

    /// Attendees holding a seat (anything but a cancellation).
    pub fn seats_taken(&self) -> usize {
        self.attendees
            .iter()
            .filter(|a| a.status != AttendeeStatus::Cancelled)
            .count()
    }

    /// Registration is open while the event is upcoming, the deadline (or the
    /// start time when no deadline is set) has not passed, and seats remain.
    pub fn is_registration_open(&self, now: DateTime<Utc>) -> bool {
        if self.status != EventStatus::Upcoming {
            return false;
        }
        let closes_at = self.registration_deadline.unwrap_or(self.starts_at);
        if now > closes_at {
            return false;
        }
        match self.capacity {
            Some(capacity) => self.seats_taken() < capacity as usize,
            None => true,
        }
    }
}

impl Document for Event {
    const COLLECTION: &'static str = "events";

    fn id(&self) -> Uuid {
        self.id
    }
    fn version(&self) -> i64 {
        self.version
    }
    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
    fn owner(&self) -> Uuid {
        self.organizer
    }
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
    fn is_listed(&self) -> bool {
        matches!(self.status, EventStatus::Upcoming | EventStatus::Ongoing)
    }
    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.description,
            self.category.as_deref().unwrap_or_default()
        )
    }
    fn participants(&self) -> Vec<Uuid> {
        self.attendees.iter().map(|a| a.user).collect()
    }
    fn engagement(&self) -> usize {
        self.seats_taken() + self.interested.len()
    }
    fn views(&self) -> u64 {
        self.views
    }
    fn views_mut(&mut self) -> &mut u64 {
        &mut self.views
    }
    fn saves(&self) -> &BTreeSet<Uuid> {
        &self.saves
    }
    fn saves_mut(&mut self) -> &mut BTreeSet<Uuid> {
        &mut self.saves
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

//=========================================================================================
// Messages
//=========================================================================================

/// A direct message. Each party can hide it independently via `deleted_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub content: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_by: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user: Uuid) -> bool {
        self.sender == user || self.receiver == user
    }

    pub fn counterpart(&self, user: Uuid) -> Uuid {
        if self.sender == user {
            self.receiver
        } else {
            self.sender
        }
    }

    pub fn visible_to(&self, user: Uuid) -> bool {
        self.involves(user) && !self.deleted_by.contains(&user)
    }
}

/// One entry of a user's inbox: the latest message exchanged with a counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub with_user: Uuid,
    pub last_message: Message,
    pub unread_count: u64,
}

//=========================================================================================
// Listing
//=========================================================================================

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-based page request, clamped into a valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Slices an already filtered and ordered result set.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Self { items, total, request }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.request.limit as u64)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

/// Filters shared by every owned-document listing. Empty filter lists
/// everything in the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub owner: Option<Uuid>,
    pub participant: Option<Uuid>,
    pub saved_by: Option<Uuid>,
    /// Restrict to documents visible in public listings.
    pub listed_only: bool,
}

impl ListFilter {
    /// In-process evaluation of the filter, used by the in-memory store and
    /// for re-checking results.
    pub fn matches<T: Document>(&self, doc: &T) -> bool {
        if self.listed_only && !doc.is_listed() {
            return false;
        }
        if let Some(status) = &self.status {
            if doc.status_key() != status {
                return false;
            }
        }
        if let Some(owner) = self.owner {
            if doc.owner() != owner {
                return false;
            }
        }
        if let Some(participant) = self.participant {
            if !doc.participants().contains(&participant) {
                return false;
            }
        }
        if let Some(saved_by) = self.saved_by {
            if !doc.saves().contains(&saved_by) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !doc.search_text().to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub search: Option<String>,
    pub college: Option<String>,
    pub skill: Option<String>,
    pub role: Option<Role>,
    pub include_inactive: bool,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if !self.include_inactive && !user.is_active {
            return false;
        }
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(college) = &self.college {
            let college = college.to_lowercase();
            if !user
                .college
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&college))
            {
                return false;
            }
        }
        if let Some(skill) = &self.skill {
            let skill = skill.to_lowercase();
            if !user.all_skills().iter().any(|s| s.to_lowercase() == skill) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !user.name.to_lowercase().contains(&needle)
                && !user.email.contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims skills, drops blanks and removes case-insensitive duplicates while
/// keeping the first spelling seen.
pub fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_skills_dedupes_case_insensitively() {
        let skills = normalize_skills(vec![
            " React ".to_string(),
            "react".to_string(),
            "".to_string(),
            "Node.js".to_string(),
        ]);
        assert_eq!(skills, vec!["React".to_string(), "Node.js".to_string()]);
    }

    #[test]
    fn page_request_is_clamped() {
        let page = PageRequest::new(Some(0), Some(1000));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn page_from_vec_reports_totals() {
        let page = Page::from_vec((1..=25).collect::<Vec<_>>(), PageRequest::new(Some(3), Some(10)));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn owner_ref_accepts_both_forms() {
        let id = Uuid::new_v4();
        let raw: OwnerRef = serde_json::from_value(serde_json::json!(id)).unwrap();
        let populated: OwnerRef = serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Asha",
            "avatarUrl": null,
            "college": null
        }))
        .unwrap();
        assert_eq!(raw.id(), id);
        assert_eq!(populated.id(), id);
    }

    #[test]
    fn new_collaboration_seats_the_creator() {
        let creator = Uuid::new_v4();
        let collab = Collaboration::new(
            CollaborationDraft {
                title: "Campus app".into(),
                description: "Build it".into(),
                category: None,
                skills_needed: vec![],
                team_size_required: 3,
            },
            creator,
            Utc::now(),
        );
        assert!(collab.is_member(creator));
        assert_eq!(collab.team_size.current, 1);
        assert_eq!(collab.team_members[0].role, CREATOR_ROLE);
    }

    #[test]
    fn registration_closes_at_capacity() {
        let now = Utc::now();
        let mut event = Event::new(
            EventDraft {
                title: "Hack night".into(),
                description: "".into(),
                category: None,
                venue: None,
                is_online: false,
                starts_at: now + chrono::Duration::days(2),
                ends_at: None,
                registration_deadline: None,
                capacity: Some(1),
                fee: None,
            },
            Uuid::new_v4(),
            now,
        );
        assert!(event.is_registration_open(now));
        event.attendees.push(Attendee {
            user: Uuid::new_v4(),
            registered_at: now,
            status: AttendeeStatus::Registered,
            payment_status: PaymentStatus::NotRequired,
        });
        assert!(!event.is_registration_open(now));
    }
}
