use crate::program::{
    AbstractObj, Code, CodeId, CodeParameters, Constant, Extractor, FieldKind, LocalId, Param,
};
use id_collections::IdVec;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default)]
struct MockObject {
    class: Option<AbstractObj>,
    unique: bool,
    primitive: bool,
    list: bool,
    fields: BTreeMap<(FieldKind, AbstractObj), AbstractObj>,
}

#[derive(Clone, Debug)]
struct MockCode {
    name: String,
    params: CodeParameters,
}

/// Shape of a function for `MockProgram::add_function`. Locals are numbered in declaration order:
/// self, positional parameters, `*args`, `**kwargs`, then return slots.
#[derive(Clone, Debug, Default)]
pub struct FunctionShape {
    pub self_param: bool,
    pub params: Vec<&'static str>,
    pub defaults: Vec<AbstractObj>,
    pub vparam: bool,
    pub kparam: bool,
    pub returns: usize,
}

/// In-memory frontend.
#[derive(Clone, Debug)]
pub struct MockProgram {
    objects: IdVec<AbstractObj, MockObject>,
    constants: BTreeMap<Constant, AbstractObj>,
    codes: IdVec<CodeId, MockCode>,
    pub type_class: AbstractObj,
    pub int_class: AbstractObj,
    pub str_class: AbstractObj,
    pub tuple_class: AbstractObj,
    tuple_instance: AbstractObj,
    pub loaded: BTreeSet<AbstractObj>,
}

impl MockProgram {
    pub fn new() -> Self {
        let mut objects = IdVec::new();
        let type_class = objects.push(MockObject::default());
        objects[type_class].class = Some(type_class);

        let mut class = || {
            objects.push(MockObject {
                class: Some(type_class),
                ..MockObject::default()
            })
        };
        let int_class = class();
        let str_class = class();
        let tuple_class = class();

        let tuple_instance = objects.push(MockObject {
            class: Some(tuple_class),
            ..MockObject::default()
        });

        MockProgram {
            objects,
            constants: BTreeMap::new(),
            codes: IdVec::new(),
            type_class,
            int_class,
            str_class,
            tuple_class,
            tuple_instance,
            loaded: BTreeSet::new(),
        }
    }

    pub fn new_class(&mut self) -> AbstractObj {
        let type_class = self.type_class;
        self.new_instance(type_class)
    }

    pub fn new_instance(&mut self, class: AbstractObj) -> AbstractObj {
        self.objects.push(MockObject {
            class: Some(class),
            ..MockObject::default()
        })
    }

    pub fn set_unique(&mut self, obj: AbstractObj, unique: bool) {
        self.objects[obj].unique = unique;
    }

    pub fn set_list(&mut self, obj: AbstractObj) {
        self.objects[obj].list = true;
    }

    pub fn set_field(
        &mut self,
        obj: AbstractObj,
        kind: FieldKind,
        key: AbstractObj,
        value: AbstractObj,
    ) {
        self.objects[obj].fields.insert((kind, key), value);
    }

    pub fn int(&mut self, value: i64) -> AbstractObj {
        self.get_object(Constant::Int(value))
    }

    pub fn str(&mut self, value: &str) -> AbstractObj {
        self.get_object(Constant::Str(value.to_owned()))
    }

    pub fn add_function(&mut self, name: &str, shape: FunctionShape) -> CodeId {
        let mut next = 0;
        let mut local = || {
            let l = LocalId(next);
            next += 1;
            Param::Local(l)
        };

        let self_param = if shape.self_param { Some(local()) } else { None };
        let params = shape.params.iter().map(|_| local()).collect();
        let vparam = if shape.vparam { Some(local()) } else { None };
        let kparam = if shape.kparam { Some(local()) } else { None };
        let return_params = (0..shape.returns).map(|_| local()).collect();

        self.add_code(
            name,
            CodeParameters {
                self_param,
                params,
                param_names: shape.params.iter().map(|n| n.to_string()).collect(),
                defaults: shape.defaults,
                vparam,
                kparam,
                return_params,
            },
        )
    }

    pub fn add_code(&mut self, name: &str, params: CodeParameters) -> CodeId {
        self.codes.push(MockCode {
            name: name.to_owned(),
            params,
        })
    }
}

impl Default for MockProgram {
    fn default() -> Self {
        MockProgram::new()
    }
}

impl Code for MockProgram {
    fn is_code(&self, code: CodeId) -> bool {
        code.0 < self.codes.len()
    }

    fn code_parameters(&self, code: CodeId) -> &CodeParameters {
        &self.codes[code].params
    }

    fn code_name(&self, code: CodeId) -> &str {
        &self.codes[code].name
    }
}

impl Extractor for MockProgram {
    fn ensure_loaded(&mut self, obj: AbstractObj) {
        self.loaded.insert(obj);
    }

    fn get_object(&mut self, value: Constant) -> AbstractObj {
        if let Some(&obj) = self.constants.get(&value) {
            return obj;
        }

        let class = match &value {
            Constant::Int(_) => self.int_class,
            Constant::Str(_) => self.str_class,
        };
        let obj = self.objects.push(MockObject {
            class: Some(class),
            primitive: true,
            ..MockObject::default()
        });
        self.constants.insert(value, obj);
        obj
    }

    fn type_of(&self, obj: AbstractObj) -> AbstractObj {
        self.objects[obj]
            .class
            .expect("every mock object is created with a class")
    }

    fn is_unique(&self, obj: AbstractObj) -> bool {
        self.objects[obj].unique
    }

    fn is_primitive(&self, obj: AbstractObj) -> bool {
        self.objects[obj].primitive
    }

    fn tuple_instance(&mut self) -> AbstractObj {
        self.tuple_instance
    }

    fn existing_field(
        &self,
        obj: AbstractObj,
        kind: FieldKind,
        key: AbstractObj,
    ) -> Option<Vec<AbstractObj>> {
        let object = &self.objects[obj];
        if object.list && kind == FieldKind::Array {
            return Some(
                object
                    .fields
                    .iter()
                    .filter(|((k, _), _)| *k == FieldKind::Array)
                    .map(|(_, &value)| value)
                    .collect(),
            );
        }
        object.fields.get(&(kind, key)).map(|&value| vec![value])
    }
}
