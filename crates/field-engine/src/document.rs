use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock, Weak};

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dependency::DependencyKey;
use crate::error::DocumentError;
use crate::field::{DocumentRef, Field, FieldContext};
use crate::snapshot::AnswerSnapshot;
use crate::spec::{AnswerSpec, DocumentSpec, QuestionKind, QuestionSpec};
use crate::visibility::answers_context;

/// A form instance and the fields built for it.
///
/// Form questions get a child document holding the fields of their sub form;
/// child documents share the id of their parent and read answers from the
/// same answer list.
pub struct Document {
    id: String,
    form: Option<String>,
    fields: Vec<Arc<Field>>,
    parent: OnceLock<Weak<Document>>,
}

impl Document {
    pub fn from_json(context: &FieldContext, json: &str) -> Result<Arc<Self>, DocumentError> {
        let spec: DocumentSpec = serde_json::from_str(json)?;
        Self::build(context, spec)
    }

    /// Builds every field, wires dependencies declared by the questions'
    /// `isHidden` / `isRequired` conditions and evaluates them once.
    pub fn build(context: &FieldContext, spec: DocumentSpec) -> Result<Arc<Self>, DocumentError> {
        let mut slugs = BTreeSet::new();
        collect_slugs(&spec.questions, &mut slugs)?;
        if let Some(unknown) = spec
            .answers
            .iter()
            .find(|answer| !slugs.contains(&answer.question))
        {
            return Err(DocumentError::UnknownQuestion(unknown.question.clone()));
        }

        let mut answers: BTreeMap<String, AnswerSpec> = spec
            .answers
            .into_iter()
            .map(|answer| (answer.question.clone(), answer))
            .collect();
        let document = Self::build_level(context, &spec.id, spec.form, spec.questions, &mut answers);
        document.wire_dependencies();
        document.refresh_all();
        Ok(document)
    }

    fn build_level(
        context: &FieldContext,
        id: &str,
        form: Option<String>,
        questions: Vec<QuestionSpec>,
        answers: &mut BTreeMap<String, AnswerSpec>,
    ) -> Arc<Self> {
        let mut children = Vec::with_capacity(questions.len());
        for question in &questions {
            let child = match &question.kind {
                QuestionKind::Form {
                    sub_form: Some(sub_form),
                } => Some(Self::build_level(
                    context,
                    id,
                    Some(sub_form.slug.clone()),
                    sub_form.questions.clone(),
                    answers,
                )),
                _ => None,
            };
            children.push(child);
        }

        let document = Arc::new_cyclic(|weak: &Weak<Document>| {
            let fields = questions
                .into_iter()
                .zip(children.iter().cloned())
                .map(|(question, child)| {
                    let answer = answers.remove(&question.slug);
                    let field = Field::new(
                        context,
                        DocumentRef::new(id, weak.clone()),
                        question,
                        answer,
                    );
                    Arc::new(match child {
                        Some(child) => field.with_child_document(child),
                        None => field,
                    })
                })
                .collect();
            Document {
                id: id.to_string(),
                form,
                fields,
                parent: OnceLock::new(),
            }
        });

        for child in children.into_iter().flatten() {
            let _ = child.parent.set(Arc::downgrade(&document));
        }
        document
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn form(&self) -> Option<&str> {
        self.form.as_deref()
    }

    /// Fields of this document, without those of child documents.
    pub fn fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    /// Fields of this document and, depth first, of all child documents.
    pub fn all_fields(&self) -> Vec<Arc<Field>> {
        let mut all = Vec::new();
        for field in &self.fields {
            all.push(Arc::clone(field));
            if let Some(child) = field.child_document() {
                all.extend(child.all_fields());
            }
        }
        all
    }

    pub fn field(&self, slug: &str) -> Option<Arc<Field>> {
        self.all_fields()
            .into_iter()
            .find(|field| field.question().slug() == slug)
    }

    pub fn visible_fields(&self) -> Vec<Arc<Field>> {
        self.fields
            .iter()
            .filter(|field| !field.hidden())
            .cloned()
            .collect()
    }

    pub fn parent(&self) -> Option<Arc<Document>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    pub fn root(self: &Arc<Self>) -> Arc<Document> {
        match self.parent() {
            Some(parent) => parent.root(),
            None => Arc::clone(self),
        }
    }

    /// `{"answers": {slug: value}}` over the whole document tree.
    pub fn answers_context(self: &Arc<Self>) -> Value {
        let root = self.root();
        answers_context(
            root.all_fields()
                .iter()
                .filter(|field| field.has_answer())
                .map(|field| (field.question().slug().to_string(), field.value())),
        )
    }

    /// Validates every field; returns whether all of them ended up valid.
    pub async fn validate_all(&self) -> bool {
        let fields = self.all_fields();
        join_all(fields.iter().map(|field| field.validate())).await;
        fields.iter().all(|field| field.is_valid())
    }

    pub fn snapshot(&self) -> AnswerSnapshot {
        AnswerSnapshot::from_fields(&self.id, &self.all_fields())
    }

    fn wire_dependencies(&self) {
        let fields = self.all_fields();
        let by_slug: BTreeMap<&str, &Arc<Field>> = fields
            .iter()
            .map(|field| (field.question().slug(), field))
            .collect();
        for dependent in &fields {
            for key in DependencyKey::ALL {
                for slug in dependent.question().depends_on(key) {
                    match by_slug.get(slug.as_str()) {
                        Some(source) => {
                            source.register_dependent_field(dependent, key);
                        }
                        None => warn!(
                            field = %dependent.id(),
                            key = key.as_str(),
                            slug = %slug,
                            "condition references an unknown question"
                        ),
                    }
                }
            }
        }
    }

    fn refresh_all(self: &Arc<Self>) {
        let ctx = self.answers_context();
        for field in self.all_fields() {
            for key in DependencyKey::ALL {
                field.question().refresh(key, &ctx);
            }
        }
        debug!(document = %self.id, fields = self.all_fields().len(), "document built");
    }
}

fn collect_slugs(
    questions: &[QuestionSpec],
    slugs: &mut BTreeSet<String>,
) -> Result<(), DocumentError> {
    for question in questions {
        if !slugs.insert(question.slug.clone()) {
            return Err(DocumentError::DuplicateQuestion(question.slug.clone()));
        }
        if let QuestionKind::Form {
            sub_form: Some(sub_form),
        } = &question.kind
        {
            collect_slugs(&sub_form.questions, slugs)?;
        }
    }
    Ok(())
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("form", &self.form)
            .field("fields", &self.fields)
            .finish()
    }
}
