/// Per-resource parameterization of the harness: which endpoint, which
/// editable fields, which table columns, what an empty list says.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Date,
    Select(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub title: &'static str,
    pub field: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    /// Key the resource-named envelope shape would use.
    pub key: &'static str,
    pub base_path: &'static str,
    pub fields: &'static [FieldSpec],
    pub columns: &'static [ColumnSpec],
    pub empty_message: &'static str,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    required: bool,
    default: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        required,
        default,
    }
}

pub const STUDENTS: ResourceSpec = ResourceSpec {
    key: "students",
    base_path: "/api/students",
    fields: &[
        field("firstName", "First name", FieldKind::Text, true, ""),
        field("lastName", "Last name", FieldKind::Text, true, ""),
        field("admissionNo", "Admission no.", FieldKind::Text, false, ""),
        field("guardianPhone", "Guardian phone", FieldKind::Text, false, ""),
        field(
            "status",
            "Status",
            FieldKind::Select(&["active", "inactive"]),
            false,
            "active",
        ),
        field("classId", "Class", FieldKind::Text, false, ""),
        field("sectionId", "Section", FieldKind::Text, false, ""),
    ],
    columns: &[
        ColumnSpec {
            title: "Name",
            field: "lastName",
        },
        ColumnSpec {
            title: "Admission no.",
            field: "admissionNo",
        },
        ColumnSpec {
            title: "Class",
            field: "className",
        },
        ColumnSpec {
            title: "Section",
            field: "sectionName",
        },
        ColumnSpec {
            title: "Status",
            field: "status",
        },
    ],
    empty_message: "No students found",
};

pub const STAFF: ResourceSpec = ResourceSpec {
    key: "staff",
    base_path: "/api/staff",
    fields: &[
        field("name", "Name", FieldKind::Text, true, ""),
        field("role", "Role", FieldKind::Text, true, ""),
        field("department", "Department", FieldKind::Text, false, ""),
        field("phone", "Phone", FieldKind::Text, false, ""),
        field(
            "status",
            "Status",
            FieldKind::Select(&["active", "inactive"]),
            false,
            "active",
        ),
    ],
    columns: &[
        ColumnSpec {
            title: "Name",
            field: "name",
        },
        ColumnSpec {
            title: "Role",
            field: "role",
        },
        ColumnSpec {
            title: "Department",
            field: "department",
        },
        ColumnSpec {
            title: "Status",
            field: "status",
        },
    ],
    empty_message: "No staff found",
};

pub const NOTICES: ResourceSpec = ResourceSpec {
    key: "notices",
    base_path: "/api/events/notices",
    fields: &[
        field("title", "Title", FieldKind::Text, true, ""),
        field("body", "Body", FieldKind::Text, false, ""),
        field("publishDate", "Publish date", FieldKind::Date, false, ""),
        field(
            "audience",
            "Audience",
            FieldKind::Select(&["all", "students", "staff", "parents"]),
            false,
            "all",
        ),
    ],
    columns: &[
        ColumnSpec {
            title: "Title",
            field: "title",
        },
        ColumnSpec {
            title: "Publish date",
            field: "publishDate",
        },
        ColumnSpec {
            title: "Audience",
            field: "audience",
        },
    ],
    empty_message: "No notices published",
};

pub const FEES: ResourceSpec = ResourceSpec {
    key: "fees",
    base_path: "/api/fees",
    fields: &[
        field("studentId", "Student", FieldKind::Text, true, ""),
        field("title", "Title", FieldKind::Text, true, ""),
        field("amount", "Amount", FieldKind::Number, true, ""),
        field("dueDate", "Due date", FieldKind::Date, true, ""),
        field(
            "status",
            "Status",
            FieldKind::Select(&["unpaid", "paid"]),
            false,
            "unpaid",
        ),
    ],
    columns: &[
        ColumnSpec {
            title: "Student",
            field: "studentName",
        },
        ColumnSpec {
            title: "Title",
            field: "title",
        },
        ColumnSpec {
            title: "Amount",
            field: "amount",
        },
        ColumnSpec {
            title: "Due",
            field: "dueDate",
        },
        ColumnSpec {
            title: "Status",
            field: "status",
        },
    ],
    empty_message: "No fee records",
};

pub const TIMETABLE: ResourceSpec = ResourceSpec {
    key: "timetable",
    base_path: "/api/academics/timetable",
    fields: &[
        field("classId", "Class", FieldKind::Text, true, ""),
        field("sectionId", "Section", FieldKind::Text, true, ""),
        field("dayOfWeek", "Day", FieldKind::Integer, true, ""),
        field("period", "Period", FieldKind::Integer, true, ""),
        field("subject", "Subject", FieldKind::Text, true, ""),
        field("staffId", "Teacher", FieldKind::Text, false, ""),
        field("startsAt", "Starts", FieldKind::Text, false, ""),
        field("endsAt", "Ends", FieldKind::Text, false, ""),
    ],
    columns: &[
        ColumnSpec {
            title: "Period",
            field: "period",
        },
        ColumnSpec {
            title: "Subject",
            field: "subject",
        },
        ColumnSpec {
            title: "Teacher",
            field: "staffName",
        },
    ],
    empty_message: "No classes scheduled",
};
